//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Embeddings and source
//! payloads are stored as compact JSON. UUIDs are stored as hyphenated
//! lowercase strings.

use chrono::{DateTime, Utc};
use footfall_core::{
  entity::{Profile, Role},
  event::{Event, EventKind},
  face::FaceEmbedding,
  occupancy::OccupancySample,
  source::{SourcePayload, SourceRecord},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Role ────────────────────────────────────────────────────────────────────

pub fn encode_role(r: Role) -> &'static str {
  match r {
    Role::Student => "student",
    Role::Faculty => "faculty",
    Role::Staff => "staff",
  }
}

pub fn decode_role(s: &str) -> Result<Role> {
  match s {
    "student" => Ok(Role::Student),
    "faculty" => Ok(Role::Faculty),
    "staff" => Ok(Role::Staff),
    other => Err(Error::Core(footfall_core::Error::UnknownRole(
      other.to_owned(),
    ))),
  }
}

// ─── EventKind ───────────────────────────────────────────────────────────────

pub fn decode_kind(s: &str) -> Result<EventKind> { Ok(EventKind::parse(s)?) }

// ─── Embeddings ──────────────────────────────────────────────────────────────

pub fn encode_embedding(v: &[f32]) -> Result<String> {
  Ok(serde_json::to_string(v)?)
}

pub fn decode_embedding(s: &str) -> Result<Vec<f32>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `profiles` row.
pub struct RawProfile {
  pub entity_id:   String,
  pub name:        String,
  pub role:        String,
  pub email:       Option<String>,
  pub department:  Option<String>,
  pub student_id:  Option<String>,
  pub staff_id:    Option<String>,
  pub card_id:     Option<String>,
  pub face_id:     Option<String>,
  pub device_hash: Option<String>,
  pub created_at:  String,
}

impl RawProfile {
  pub fn into_profile(self) -> Result<Profile> {
    Ok(Profile {
      entity_id:   self.entity_id,
      name:        self.name,
      role:        decode_role(&self.role)?,
      email:       self.email,
      department:  self.department,
      student_id:  self.student_id,
      staff_id:    self.staff_id,
      card_id:     self.card_id,
      face_id:     self.face_id,
      device_hash: self.device_hash,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from an `events` row.
pub struct RawEvent {
  pub event_id:   String,
  pub entity_id:  Option<String>,
  pub location:   Option<String>,
  pub timestamp:  String,
  pub confidence: f64,
  pub event_type: String,
  pub created_at: String,
}

impl RawEvent {
  pub fn into_event(self) -> Result<Event> {
    Ok(Event {
      event_id:   decode_uuid(&self.event_id)?,
      entity_id:  self.entity_id,
      location:   self.location,
      timestamp:  decode_dt(&self.timestamp)?,
      confidence: self.confidence,
      kind:       decode_kind(&self.event_type)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `source_records` row.
pub struct RawSourceRecord {
  pub record_id:    String,
  pub event_id:     Option<String>,
  pub source_kind:  String,
  pub timestamp:    String,
  pub payload_json: String,
}

impl RawSourceRecord {
  pub fn into_record(self) -> Result<SourceRecord> {
    let data: serde_json::Value = serde_json::from_str(&self.payload_json)?;
    let payload = SourcePayload::from_parts(&self.source_kind, data)?;
    Ok(SourceRecord {
      record_id: self.record_id,
      event_id:  self.event_id.as_deref().map(decode_uuid).transpose()?,
      timestamp: decode_dt(&self.timestamp)?,
      payload,
    })
  }
}

/// Raw strings read directly from a `face_embeddings` row.
pub struct RawFaceEmbedding {
  pub face_id:        String,
  pub entity_id:      Option<String>,
  pub embedding_json: String,
  pub model:          Option<String>,
}

impl RawFaceEmbedding {
  pub fn into_embedding(self) -> Result<FaceEmbedding> {
    Ok(FaceEmbedding {
      face_id:   self.face_id,
      entity_id: self.entity_id,
      embedding: decode_embedding(&self.embedding_json)?,
      model:     self.model,
    })
  }
}

/// Raw strings read directly from an `occupancy_data` row.
pub struct RawOccupancy {
  pub location_id: String,
  pub start_time:  String,
  pub count:       i64,
}

impl RawOccupancy {
  pub fn into_sample(self) -> Result<OccupancySample> {
    Ok(OccupancySample {
      location_id: self.location_id,
      start_time:  decode_dt(&self.start_time)?,
      count:       self.count.max(0) as u32,
    })
  }
}
