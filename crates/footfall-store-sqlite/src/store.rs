//! [`SqliteStore`] — the SQLite implementation of [`CampusStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use footfall_core::{
  entity::Profile,
  event::{Event, EventKind},
  face::FaceEmbedding,
  occupancy::OccupancySample,
  source::SourceRecord,
  store::{AttributedEvent, CampusStore, EventRef, TimelineQuery},
};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    RawEvent, RawFaceEmbedding, RawOccupancy, RawProfile, RawSourceRecord,
    decode_dt, decode_role, decode_uuid, encode_dt, encode_embedding,
    encode_role, encode_uuid,
  },
  schema::SCHEMA,
};

/// The `source_kind` column value for each canonical event kind.
fn source_discriminant(kind: EventKind) -> &'static str {
  match kind {
    EventKind::WifiLog => "wifi_log",
    EventKind::CardSwipe => "card_swipe",
    EventKind::CctvFrame => "cctv_frame",
    EventKind::LabBooking => "lab_booking",
    EventKind::LibraryCheckout => "library_checkout",
    EventKind::Note => "note",
  }
}

const EVENT_COLUMNS: &str =
  "event_id, entity_id, location, timestamp, confidence, event_type, created_at";

const PROFILE_COLUMNS: &str = "entity_id, name, role, email, department, \
   student_id, staff_id, card_id, face_id, device_hash, created_at";

fn read_profile(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawProfile> {
  Ok(RawProfile {
    entity_id:   row.get(0)?,
    name:        row.get(1)?,
    role:        row.get(2)?,
    email:       row.get(3)?,
    department:  row.get(4)?,
    student_id:  row.get(5)?,
    staff_id:    row.get(6)?,
    card_id:     row.get(7)?,
    face_id:     row.get(8)?,
    device_hash: row.get(9)?,
    created_at:  row.get(10)?,
  })
}

fn read_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawEvent> {
  Ok(RawEvent {
    event_id:   row.get(0)?,
    entity_id:  row.get(1)?,
    location:   row.get(2)?,
    timestamp:  row.get(3)?,
    confidence: row.get(4)?,
    event_type: row.get(5)?,
    created_at: row.get(6)?,
  })
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Footfall campus store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Pre-encode an event batch into the plain strings stored per row.
  fn encode_events(events: &[Event]) -> Vec<(String, Option<String>, Option<String>, String, f64, String, String)> {
    events
      .iter()
      .map(|ev| {
        (
          encode_uuid(ev.event_id),
          ev.entity_id.clone(),
          ev.location.clone(),
          encode_dt(ev.timestamp),
          ev.confidence,
          ev.kind.discriminant().to_owned(),
          encode_dt(ev.created_at),
        )
      })
      .collect()
  }
}

// ─── CampusStore impl ────────────────────────────────────────────────────────

impl CampusStore for SqliteStore {
  type Error = Error;

  // ── Profiles ──────────────────────────────────────────────────────────────

  async fn add_profile(&self, profile: Profile) -> Result<()> {
    let role_str = encode_role(profile.role).to_owned();
    let at_str   = encode_dt(profile.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO profiles (entity_id, name, role, email, department,
             student_id, staff_id, card_id, face_id, device_hash, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
          rusqlite::params![
            profile.entity_id,
            profile.name,
            role_str,
            profile.email,
            profile.department,
            profile.student_id,
            profile.staff_id,
            profile.card_id,
            profile.face_id,
            profile.device_hash,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_profile(&self, entity_id: &str) -> Result<Option<Profile>> {
    let id = entity_id.to_owned();

    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE entity_id = ?1"),
              rusqlite::params![id],
              read_profile,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawProfile::into_profile).transpose()
  }

  async fn list_profiles(&self) -> Result<Vec<Profile>> {
    let raws: Vec<RawProfile> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn
          .prepare(&format!("SELECT {PROFILE_COLUMNS} FROM profiles ORDER BY name"))?;
        let rows = stmt
          .query_map([], read_profile)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawProfile::into_profile).collect()
  }

  async fn search_profiles(&self, query: &str, limit: usize) -> Result<Vec<Profile>> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
      return Ok(Vec::new());
    }
    let pattern   = format!("%{trimmed}%");
    let limit_val = limit as i64;

    let raws: Vec<RawProfile> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PROFILE_COLUMNS} FROM profiles
           WHERE name LIKE ?1 OR email LIKE ?1 OR entity_id LIKE ?1
              OR student_id LIKE ?1 OR staff_id LIKE ?1
              OR card_id LIKE ?1 OR face_id LIKE ?1 OR device_hash LIKE ?1
           ORDER BY name
           LIMIT ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![pattern, limit_val], read_profile)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawProfile::into_profile).collect()
  }

  async fn delete_profile(&self, entity_id: &str) -> Result<bool> {
    let id = entity_id.to_owned();

    let deleted = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "DELETE FROM profiles WHERE entity_id = ?1",
          rusqlite::params![id],
        )?;
        Ok(n)
      })
      .await?;

    Ok(deleted > 0)
  }

  // ── Canonical events ──────────────────────────────────────────────────────

  async fn replace_events(&self, events: Vec<Event>) -> Result<usize> {
    let rows = Self::encode_events(&events);

    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM events", [])?;
        let mut n = 0;
        for row in &rows {
          n += tx.execute(
            &format!("INSERT INTO events ({EVENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
            rusqlite::params![row.0, row.1, row.2, row.3, row.4, row.5, row.6],
          )?;
        }
        tx.commit()?;
        Ok(n)
      })
      .await?;

    Ok(inserted)
  }

  async fn insert_events(&self, events: Vec<Event>) -> Result<usize> {
    let rows = Self::encode_events(&events);

    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut n = 0;
        for row in &rows {
          n += tx.execute(
            &format!("INSERT INTO events ({EVENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
            rusqlite::params![row.0, row.1, row.2, row.3, row.4, row.5, row.6],
          )?;
        }
        tx.commit()?;
        Ok(n)
      })
      .await?;

    Ok(inserted)
  }

  async fn events_for_entity(
    &self,
    entity_id: &str,
    query: &TimelineQuery,
  ) -> Result<Vec<Event>> {
    // Build WHERE clause dynamically; bounds are inclusive.
    let mut sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE entity_id = ?");
    let mut args: Vec<String> = vec![entity_id.to_owned()];

    if let Some(start) = query.start {
      sql.push_str(" AND timestamp >= ?");
      args.push(encode_dt(start));
    }
    if let Some(end) = query.end {
      sql.push_str(" AND timestamp <= ?");
      args.push(encode_dt(end));
    }
    if !query.kinds.is_empty() {
      let placeholders = vec!["?"; query.kinds.len()].join(", ");
      sql.push_str(&format!(" AND event_type IN ({placeholders})"));
      args.extend(query.kinds.iter().map(|k| k.discriminant().to_owned()));
    }
    sql.push_str(" ORDER BY timestamp");

    let raws: Vec<RawEvent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(args), read_event)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEvent::into_event).collect()
  }

  async fn last_seen(&self, entity_id: &str) -> Result<Option<DateTime<Utc>>> {
    let id = entity_id.to_owned();

    let last: Option<String> = self
      .conn
      .call(move |conn| {
        let v: Option<String> = conn.query_row(
          "SELECT MAX(timestamp) FROM events WHERE entity_id = ?1",
          rusqlite::params![id],
          |r| r.get(0),
        )?;
        Ok(v)
      })
      .await?;

    last.as_deref().map(decode_dt).transpose()
  }

  async fn entity_event_times(&self) -> Result<Vec<(String, Vec<DateTime<Utc>>)>> {
    let rows: Vec<(String, String)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT entity_id, timestamp FROM events
           WHERE entity_id IS NOT NULL
           ORDER BY entity_id, timestamp",
        )?;
        let rows = stmt
          .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut out: Vec<(String, Vec<DateTime<Utc>>)> = Vec::new();
    for (entity_id, ts_str) in rows {
      let ts = decode_dt(&ts_str)?;
      match out.last_mut() {
        Some((id, times)) if *id == entity_id => times.push(ts),
        _ => out.push((entity_id, vec![ts])),
      }
    }
    Ok(out)
  }

  async fn events_with_roles(&self) -> Result<Vec<AttributedEvent>> {
    let rows: Vec<(RawEvent, String)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT e.event_id, e.entity_id, e.location, e.timestamp,
                  e.confidence, e.event_type, e.created_at, p.role
           FROM events e
           JOIN profiles p ON p.entity_id = e.entity_id
           ORDER BY e.timestamp",
        )?;
        let rows = stmt
          .query_map([], |row| Ok((read_event(row)?, row.get(7)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(raw, role_str)| {
        Ok(AttributedEvent {
          event: raw.into_event()?,
          role:  decode_role(&role_str)?,
        })
      })
      .collect()
  }

  async fn event_index(&self) -> Result<Vec<EventRef>> {
    let rows: Vec<(String, String, String)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT event_id, entity_id, timestamp FROM events
           WHERE entity_id IS NOT NULL",
        )?;
        let rows = stmt
          .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(id_str, entity_id, ts_str)| {
        Ok(EventRef {
          event_id:  decode_uuid(&id_str)?,
          entity_id,
          timestamp: decode_dt(&ts_str)?,
        })
      })
      .collect()
  }

  // ── Source records ────────────────────────────────────────────────────────

  async fn replace_source_records(
    &self,
    kind: EventKind,
    records: Vec<SourceRecord>,
  ) -> Result<usize> {
    let kind_str = source_discriminant(kind).to_owned();

    // Encode outside the connection thread; JSON errors surface here.
    let mut rows: Vec<(String, Option<String>, String, String, String)> =
      Vec::with_capacity(records.len());
    for rec in &records {
      rows.push((
        rec.record_id.clone(),
        rec.event_id.map(encode_uuid),
        rec.payload.discriminant().to_owned(),
        encode_dt(rec.timestamp),
        rec.payload.to_json()?.to_string(),
      ));
    }

    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "DELETE FROM source_records WHERE source_kind = ?1",
          rusqlite::params![kind_str],
        )?;
        let mut n = 0;
        for row in &rows {
          // Duplicate natural keys are skipped, matching append-only
          // re-import semantics.
          n += tx.execute(
            "INSERT OR IGNORE INTO source_records
               (record_id, event_id, source_kind, timestamp, payload_json)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![row.0, row.1, row.2, row.3, row.4],
          )?;
        }
        tx.commit()?;
        Ok(n)
      })
      .await?;

    Ok(inserted)
  }

  async fn source_records_for_events(
    &self,
    event_ids: &[Uuid],
  ) -> Result<Vec<SourceRecord>> {
    if event_ids.is_empty() {
      return Ok(Vec::new());
    }
    let ids: Vec<String> = event_ids.iter().copied().map(encode_uuid).collect();
    let placeholders = vec!["?"; ids.len()].join(", ");

    let raws: Vec<RawSourceRecord> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT record_id, event_id, source_kind, timestamp, payload_json
           FROM source_records
           WHERE event_id IN ({placeholders})
           ORDER BY timestamp"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(ids), |row| {
            Ok(RawSourceRecord {
              record_id:    row.get(0)?,
              event_id:     row.get(1)?,
              source_kind:  row.get(2)?,
              timestamp:    row.get(3)?,
              payload_json: row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSourceRecord::into_record).collect()
  }

  // ── Face embeddings ───────────────────────────────────────────────────────

  async fn put_face_embedding(&self, embedding: FaceEmbedding) -> Result<bool> {
    let vec_json = encode_embedding(&embedding.embedding)?;

    let inserted = self
      .conn
      .call(move |conn| {
        // Write-once: an existing face_id keeps its stored vector.
        let n = conn.execute(
          "INSERT OR IGNORE INTO face_embeddings
             (face_id, entity_id, embedding_json, model)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![
            embedding.face_id,
            embedding.entity_id,
            vec_json,
            embedding.model,
          ],
        )?;
        Ok(n)
      })
      .await?;

    Ok(inserted > 0)
  }

  async fn all_face_embeddings(&self) -> Result<Vec<FaceEmbedding>> {
    let raws: Vec<RawFaceEmbedding> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT face_id, entity_id, embedding_json, model FROM face_embeddings",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawFaceEmbedding {
              face_id:        row.get(0)?,
              entity_id:      row.get(1)?,
              embedding_json: row.get(2)?,
              model:          row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawFaceEmbedding::into_embedding)
      .collect()
  }

  // ── Occupancy ─────────────────────────────────────────────────────────────

  async fn replace_occupancy(&self, samples: Vec<OccupancySample>) -> Result<usize> {
    let rows: Vec<(String, String, i64)> = samples
      .iter()
      .map(|s| (s.location_id.clone(), encode_dt(s.start_time), s.count as i64))
      .collect();

    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM occupancy_data", [])?;
        let mut n = 0;
        for row in &rows {
          n += tx.execute(
            "INSERT OR IGNORE INTO occupancy_data (location_id, start_time, count)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![row.0, row.1, row.2],
          )?;
        }
        tx.commit()?;
        Ok(n)
      })
      .await?;

    Ok(inserted)
  }

  async fn occupancy_for_location(
    &self,
    location_id: &str,
  ) -> Result<Vec<OccupancySample>> {
    let loc = location_id.to_owned();

    let raws: Vec<RawOccupancy> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT location_id, start_time, count FROM occupancy_data
           WHERE location_id = ?1
           ORDER BY start_time",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![loc], |row| {
            Ok(RawOccupancy {
              location_id: row.get(0)?,
              start_time:  row.get(1)?,
              count:       row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawOccupancy::into_sample).collect()
  }

  async fn all_occupancy(&self) -> Result<Vec<OccupancySample>> {
    let raws: Vec<RawOccupancy> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT location_id, start_time, count FROM occupancy_data
           ORDER BY location_id, start_time",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawOccupancy {
              location_id: row.get(0)?,
              start_time:  row.get(1)?,
              count:       row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawOccupancy::into_sample).collect()
  }
}
