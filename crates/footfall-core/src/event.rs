//! Canonical events — the unified activity stream.
//!
//! A canonical event is a timestamped occurrence attributable to a profile.
//! The entity reference is nullable: unresolved events are retained for audit
//! but excluded from entity-scoped queries. Deleting a profile nulls the
//! reference on its events; event history is never cascade-deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// The source kind an event was derived from. Closed set of six.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
  #[serde(rename = "wifi_logs")]
  WifiLog,
  #[serde(rename = "card_swipes")]
  CardSwipe,
  #[serde(rename = "cctv_frames")]
  CctvFrame,
  #[serde(rename = "lab_booking")]
  LabBooking,
  #[serde(rename = "library_checkouts")]
  LibraryCheckout,
  #[serde(rename = "text_notes")]
  Note,
}

impl EventKind {
  /// The discriminant string stored in the `event_type` column.
  /// Must match the serde renames above.
  pub fn discriminant(self) -> &'static str {
    match self {
      Self::WifiLog => "wifi_logs",
      Self::CardSwipe => "card_swipes",
      Self::CctvFrame => "cctv_frames",
      Self::LabBooking => "lab_booking",
      Self::LibraryCheckout => "library_checkouts",
      Self::Note => "text_notes",
    }
  }

  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "wifi_logs" => Ok(Self::WifiLog),
      "card_swipes" => Ok(Self::CardSwipe),
      "cctv_frames" => Ok(Self::CctvFrame),
      "lab_booking" => Ok(Self::LabBooking),
      "library_checkouts" => Ok(Self::LibraryCheckout),
      "text_notes" => Ok(Self::Note),
      other => Err(Error::UnknownEventKind(other.to_owned())),
    }
  }
}

/// A timestamped occurrence attributable to a profile.
///
/// `confidence` is in [0, 1]. `timestamp` is timezone-aware UTC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
  pub event_id:   Uuid,
  pub entity_id:  Option<String>,
  pub location:   Option<String>,
  pub timestamp:  DateTime<Utc>,
  pub confidence: f64,
  pub kind:       EventKind,
  pub created_at: DateTime<Utc>,
}

impl Event {
  /// Build a new event with a fresh id, clamping confidence into [0, 1].
  pub fn new(
    entity_id: Option<String>,
    location: Option<String>,
    timestamp: DateTime<Utc>,
    confidence: f64,
    kind: EventKind,
  ) -> Self {
    Self {
      event_id: Uuid::new_v4(),
      entity_id,
      location,
      timestamp,
      confidence: confidence.clamp(0.0, 1.0),
      kind,
      created_at: Utc::now(),
    }
  }
}
