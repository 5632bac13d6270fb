//! Profile — the canonical person record that unifies all sensor identifiers.
//!
//! A profile is created at import time and is immutable once events have been
//! linked to it, except for identifier corrections. Everything the sensors
//! know about a person hangs off the external identifiers stored here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The role of a person on campus. Closed set; drives access-rule audits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Student,
  Faculty,
  Staff,
}

/// The canonical person record.
///
/// Exactly one of `student_id` / `staff_id` is non-null (checked by
/// [`Profile::validate`] at import and by a CHECK constraint in storage).
/// `card_id`, `face_id` and `device_hash` are each unique across profiles
/// when present; duplicates are a data-integrity error at import time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
  pub entity_id:   String,
  pub name:        String,
  pub role:        Role,
  pub email:       Option<String>,
  pub department:  Option<String>,
  pub student_id:  Option<String>,
  pub staff_id:    Option<String>,
  pub card_id:     Option<String>,
  pub face_id:     Option<String>,
  pub device_hash: Option<String>,
  pub created_at:  DateTime<Utc>,
}

impl Profile {
  /// Enforce the exactly-one-of-{student_id, staff_id} invariant.
  pub fn validate(&self) -> Result<()> {
    match (&self.student_id, &self.staff_id) {
      (Some(_), None) | (None, Some(_)) => Ok(()),
      (Some(_), Some(_)) => Err(Error::Validation(format!(
        "profile {} carries both a student and a staff identifier",
        self.entity_id
      ))),
      (None, None) => Err(Error::Validation(format!(
        "profile {} carries neither a student nor a staff identifier",
        self.entity_id
      ))),
    }
  }

  /// The identifier value of `kind` held by this profile, if any.
  pub fn identifier(&self, kind: IdentifierKind) -> Option<&str> {
    match kind {
      IdentifierKind::CardId => self.card_id.as_deref(),
      IdentifierKind::FaceId => self.face_id.as_deref(),
      IdentifierKind::DeviceHash => self.device_hash.as_deref(),
      IdentifierKind::EntityId => Some(&self.entity_id),
    }
  }
}

/// The kinds of external identifiers a raw source record may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierKind {
  CardId,
  FaceId,
  DeviceHash,
  /// The canonical id itself — notes, lab bookings and library checkouts
  /// carry it directly.
  EntityId,
}

impl IdentifierKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::CardId => "card_id",
      Self::FaceId => "face_id",
      Self::DeviceHash => "device_hash",
      Self::EntityId => "entity_id",
    }
  }
}
