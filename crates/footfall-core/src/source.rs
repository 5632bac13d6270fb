//! Source records — the raw per-sensor log rows.
//!
//! Six variants share a base contract (record id, linked-event reference,
//! timestamp) and carry a type-specific payload. Source data is append-only
//! and re-imported via full delete+reload, never incrementally patched; a
//! record is immutable once inserted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Result, event::EventKind};

// ─── Payload ─────────────────────────────────────────────────────────────────

/// The typed payload of a source record. The variant name serves as the
/// `source_kind` discriminant stored in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "source", content = "data", rename_all = "snake_case")]
pub enum SourcePayload {
  WifiLog {
    device_hash: String,
    /// Access-point identifier the device associated with.
    ap_id:       String,
  },
  CardSwipe {
    card_id:     String,
    location_id: String,
  },
  CctvFrame {
    frame_id:    String,
    location_id: Option<String>,
    face_id:     Option<String>,
  },
  Note {
    note_id:   String,
    entity_id: String,
    category:  Option<String>,
    text:      String,
  },
  LabBooking {
    booking_id: String,
    entity_id:  String,
    room_id:    String,
    end_time:   DateTime<Utc>,
    attended:   bool,
  },
  LibraryCheckout {
    checkout_id: String,
    entity_id:   String,
    book_id:     String,
  },
}

impl SourcePayload {
  /// The event kind this payload maps to in the canonical stream.
  pub fn kind(&self) -> EventKind {
    match self {
      Self::WifiLog { .. } => EventKind::WifiLog,
      Self::CardSwipe { .. } => EventKind::CardSwipe,
      Self::CctvFrame { .. } => EventKind::CctvFrame,
      Self::Note { .. } => EventKind::Note,
      Self::LabBooking { .. } => EventKind::LabBooking,
      Self::LibraryCheckout { .. } => EventKind::LibraryCheckout,
    }
  }

  /// The record's own primary identifier. Wi-Fi and card-swipe rows have no
  /// natural id of their own, so one is synthesised from the per-variant
  /// unique key (identifier, timestamp).
  pub fn record_id(&self, timestamp: DateTime<Utc>) -> String {
    match self {
      Self::WifiLog { device_hash, .. } => {
        format!("wifi:{device_hash}@{}", timestamp.to_rfc3339())
      }
      Self::CardSwipe { card_id, .. } => {
        format!("swipe:{card_id}@{}", timestamp.to_rfc3339())
      }
      Self::CctvFrame { frame_id, .. } => frame_id.clone(),
      Self::Note { note_id, .. } => note_id.clone(),
      Self::LabBooking { booking_id, .. } => booking_id.clone(),
      Self::LibraryCheckout { checkout_id, .. } => checkout_id.clone(),
    }
  }

  /// Serialise the inner payload (without the type tag) for the
  /// `payload_json` database column.
  pub fn to_json(&self) -> Result<serde_json::Value> {
    let full = serde_json::to_value(self)?;
    Ok(full.get("data").cloned().unwrap_or(serde_json::Value::Null))
  }

  /// Deserialise from the discriminant string and JSON payload stored in the
  /// database.
  pub fn from_parts(discriminant: &str, data: serde_json::Value) -> Result<Self> {
    let wrapped = serde_json::json!({ "source": discriminant, "data": data });
    Ok(serde_json::from_value(wrapped)?)
  }

  /// The discriminant string stored in the `source_kind` column.
  pub fn discriminant(&self) -> &'static str {
    match self {
      Self::WifiLog { .. } => "wifi_log",
      Self::CardSwipe { .. } => "card_swipe",
      Self::CctvFrame { .. } => "cctv_frame",
      Self::Note { .. } => "note",
      Self::LabBooking { .. } => "lab_booking",
      Self::LibraryCheckout { .. } => "library_checkout",
    }
  }
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// A raw source record, optionally linked to the canonical event the linker
/// attributed it to. Unresolved and unlinked records keep `event_id = None`:
/// they are retained in the raw store but never appear in canonical joins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
  pub record_id: String,
  pub event_id:  Option<Uuid>,
  pub timestamp: DateTime<Utc>,
  pub payload:   SourcePayload,
}

impl SourceRecord {
  pub fn new(
    payload: SourcePayload,
    timestamp: DateTime<Utc>,
    event_id: Option<Uuid>,
  ) -> Self {
    Self {
      record_id: payload.record_id(timestamp),
      event_id,
      timestamp,
      payload,
    }
  }
}
