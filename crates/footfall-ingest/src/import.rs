//! Delete-then-reload batch importers, one per source kind.
//!
//! Each importer resolves the row's identifier, links the row to the
//! nearest-preceding canonical event, and writes the whole batch through the
//! store in one replace. Unresolved and unlinked rows are inserted with a
//! null event reference: retained in the raw store, absent from canonical
//! joins.

use chrono::{DateTime, Utc};
use footfall_core::{
  entity::{IdentifierKind, Profile},
  event::{Event, EventKind},
  face::FaceEmbedding,
  occupancy::OccupancySample,
  source::{SourcePayload, SourceRecord},
  store::CampusStore,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{Error, Result, linker::EventLinker, resolver::IdentifierIndex};

// ─── Row types ───────────────────────────────────────────────────────────────

// Pre-parsed rows handed over by the ingestion collaborator. Timestamps are
// already timezone-aware UTC; rows that failed to parse never reach us.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRow {
  pub entity_id:  Option<String>,
  pub location:   Option<String>,
  pub timestamp:  DateTime<Utc>,
  pub confidence: Option<f64>,
  pub event_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WifiRow {
  pub device_hash: String,
  pub ap_id:       String,
  pub timestamp:   DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardSwipeRow {
  pub card_id:     String,
  pub location_id: String,
  pub timestamp:   DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CctvFrameRow {
  pub frame_id:    String,
  pub location_id: Option<String>,
  pub face_id:     Option<String>,
  pub timestamp:   DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteRow {
  pub note_id:   String,
  pub entity_id: String,
  pub category:  Option<String>,
  pub text:      String,
  pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabBookingRow {
  pub booking_id: String,
  pub entity_id:  String,
  pub room_id:    String,
  pub start_time: DateTime<Utc>,
  pub end_time:   DateTime<Utc>,
  pub attended:   bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryCheckoutRow {
  pub checkout_id: String,
  pub entity_id:   String,
  pub book_id:     String,
  pub timestamp:   DateTime<Utc>,
}

// ─── Report ──────────────────────────────────────────────────────────────────

/// Outcome counters for one source-kind batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
  pub read:       usize,
  /// Rows whose identifier resolved to a profile.
  pub resolved:   usize,
  /// Resolved rows that found a nearest-preceding event.
  pub linked:     usize,
  /// Rows written to the raw store (duplicates within the batch collapse).
  pub inserted:   usize,
}

// ─── Profile / event imports ─────────────────────────────────────────────────

/// Validate and persist a profile batch. Building the identifier index over
/// the batch is what surfaces duplicate-identifier collisions; the whole
/// import step fails on the first one.
pub async fn import_profiles<S: CampusStore>(
  store: &S,
  profiles: Vec<Profile>,
) -> Result<usize> {
  for profile in &profiles {
    profile.validate()?;
  }
  IdentifierIndex::build(&profiles)?;

  let n = profiles.len();
  for profile in profiles {
    store.add_profile(profile).await.map_err(Error::store)?;
  }
  info!(profiles = n, "profile import complete");
  Ok(n)
}

/// Replace the canonical event stream with a fresh batch. Rows with an
/// unknown event type are skipped; rows naming an unknown entity are kept
/// with a null entity reference (retained for audit).
pub async fn import_events<S: CampusStore>(
  store: &S,
  rows: Vec<EventRow>,
) -> Result<ImportReport> {
  let profiles = store.list_profiles().await.map_err(Error::store)?;
  let index = IdentifierIndex::build(&profiles)?;

  let mut report = ImportReport { read: rows.len(), ..Default::default() };
  let mut events = Vec::with_capacity(rows.len());
  for row in rows {
    let kind = match EventKind::parse(&row.event_type) {
      Ok(kind) => kind,
      Err(_) => {
        warn!(event_type = %row.event_type, "skipping event with unknown type");
        continue;
      }
    };
    let entity_id = row
      .entity_id
      .as_deref()
      .and_then(|id| index.lookup(IdentifierKind::EntityId, id))
      .map(str::to_owned);
    if entity_id.is_some() {
      report.resolved += 1;
    }
    events.push(Event::new(
      entity_id,
      row.location,
      row.timestamp,
      row.confidence.unwrap_or(1.0),
      kind,
    ));
  }

  report.inserted = store.replace_events(events).await.map_err(Error::store)?;
  info!(
    read = report.read,
    resolved = report.resolved,
    inserted = report.inserted,
    "event import complete"
  );
  Ok(report)
}

/// Replace the occupancy table with a fresh batch.
pub async fn import_occupancy<S: CampusStore>(
  store: &S,
  samples: Vec<OccupancySample>,
) -> Result<usize> {
  let n = store.replace_occupancy(samples).await.map_err(Error::store)?;
  info!(samples = n, "occupancy import complete");
  Ok(n)
}

/// Enrol a batch of face embeddings. The entity reference comes from the
/// profile holding the matching face id, when one exists; vectors are
/// write-once, so re-imports leave existing rows untouched.
pub async fn import_face_embeddings<S: CampusStore>(
  store: &S,
  rows: Vec<(String, Vec<f32>)>,
) -> Result<usize> {
  let profiles = store.list_profiles().await.map_err(Error::store)?;
  let index = IdentifierIndex::build(&profiles)?;

  let mut inserted = 0;
  for (face_id, vector) in rows {
    let entity_id = index
      .lookup(IdentifierKind::FaceId, &face_id)
      .map(str::to_owned);
    let embedding = FaceEmbedding::new(face_id, entity_id, vector)?;
    if store.put_face_embedding(embedding).await.map_err(Error::store)? {
      inserted += 1;
    }
  }
  info!(embeddings = inserted, "face embedding import complete");
  Ok(inserted)
}

// ─── Source-record importer ──────────────────────────────────────────────────

/// Shared context for the per-source-kind importers: the identifier index
/// and the per-entity sorted event lists, both built once from the store
/// snapshot taken at `prepare` time.
pub struct Importer {
  index:  IdentifierIndex,
  linker: EventLinker,
}

impl Importer {
  /// Snapshot profiles and events, building the resolver index and the
  /// sorted linker lists.
  pub async fn prepare<S: CampusStore>(store: &S) -> Result<Self> {
    let profiles = store.list_profiles().await.map_err(Error::store)?;
    let index = IdentifierIndex::build(&profiles)?;
    let linker = EventLinker::build(store.event_index().await.map_err(Error::store)?);
    Ok(Self { index, linker })
  }

  /// Resolve + link one row, producing the record and updating counters.
  fn attribute(
    &self,
    report: &mut ImportReport,
    kind: IdentifierKind,
    identifier: Option<&str>,
    timestamp: DateTime<Utc>,
    payload: SourcePayload,
  ) -> SourceRecord {
    report.read += 1;
    let entity_id = identifier.and_then(|v| self.index.lookup(kind, v));
    let event_id = match entity_id {
      Some(id) => {
        report.resolved += 1;
        let linked = self.linker.link(id, timestamp);
        if linked.is_some() {
          report.linked += 1;
        }
        linked
      }
      None => None,
    };
    SourceRecord::new(payload, timestamp, event_id)
  }

  pub async fn import_wifi_logs<S: CampusStore>(
    &self,
    store: &S,
    rows: Vec<WifiRow>,
  ) -> Result<ImportReport> {
    let mut report = ImportReport::default();
    let records = rows
      .into_iter()
      .map(|row| {
        let identifier = row.device_hash.clone();
        self.attribute(
          &mut report,
          IdentifierKind::DeviceHash,
          Some(&identifier),
          row.timestamp,
          SourcePayload::WifiLog {
            device_hash: row.device_hash,
            ap_id:       row.ap_id,
          },
        )
      })
      .collect();
    report.inserted = store
      .replace_source_records(EventKind::WifiLog, records)
      .await
      .map_err(Error::store)?;
    info!(?report, "wifi log import complete");
    Ok(report)
  }

  pub async fn import_card_swipes<S: CampusStore>(
    &self,
    store: &S,
    rows: Vec<CardSwipeRow>,
  ) -> Result<ImportReport> {
    let mut report = ImportReport::default();
    let records = rows
      .into_iter()
      .map(|row| {
        let identifier = row.card_id.clone();
        self.attribute(
          &mut report,
          IdentifierKind::CardId,
          Some(&identifier),
          row.timestamp,
          SourcePayload::CardSwipe {
            card_id:     row.card_id,
            location_id: row.location_id,
          },
        )
      })
      .collect();
    report.inserted = store
      .replace_source_records(EventKind::CardSwipe, records)
      .await
      .map_err(Error::store)?;
    info!(?report, "card swipe import complete");
    Ok(report)
  }

  pub async fn import_cctv_frames<S: CampusStore>(
    &self,
    store: &S,
    rows: Vec<CctvFrameRow>,
  ) -> Result<ImportReport> {
    let mut report = ImportReport::default();
    let records = rows
      .into_iter()
      .map(|row| {
        let identifier = row.face_id.clone();
        self.attribute(
          &mut report,
          IdentifierKind::FaceId,
          identifier.as_deref(),
          row.timestamp,
          SourcePayload::CctvFrame {
            frame_id:    row.frame_id,
            location_id: row.location_id,
            face_id:     row.face_id,
          },
        )
      })
      .collect();
    report.inserted = store
      .replace_source_records(EventKind::CctvFrame, records)
      .await
      .map_err(Error::store)?;
    info!(?report, "cctv frame import complete");
    Ok(report)
  }

  pub async fn import_notes<S: CampusStore>(
    &self,
    store: &S,
    rows: Vec<NoteRow>,
  ) -> Result<ImportReport> {
    let mut report = ImportReport::default();
    let records = rows
      .into_iter()
      .map(|row| {
        let identifier = row.entity_id.clone();
        self.attribute(
          &mut report,
          IdentifierKind::EntityId,
          Some(&identifier),
          row.timestamp,
          SourcePayload::Note {
            note_id:   row.note_id,
            entity_id: row.entity_id,
            category:  row.category,
            text:      row.text,
          },
        )
      })
      .collect();
    report.inserted = store
      .replace_source_records(EventKind::Note, records)
      .await
      .map_err(Error::store)?;
    info!(?report, "note import complete");
    Ok(report)
  }

  pub async fn import_lab_bookings<S: CampusStore>(
    &self,
    store: &S,
    rows: Vec<LabBookingRow>,
  ) -> Result<ImportReport> {
    let mut report = ImportReport::default();
    let records = rows
      .into_iter()
      .map(|row| {
        let identifier = row.entity_id.clone();
        self.attribute(
          &mut report,
          IdentifierKind::EntityId,
          Some(&identifier),
          row.start_time,
          SourcePayload::LabBooking {
            booking_id: row.booking_id,
            entity_id:  row.entity_id,
            room_id:    row.room_id,
            end_time:   row.end_time,
            attended:   row.attended,
          },
        )
      })
      .collect();
    report.inserted = store
      .replace_source_records(EventKind::LabBooking, records)
      .await
      .map_err(Error::store)?;
    info!(?report, "lab booking import complete");
    Ok(report)
  }

  pub async fn import_library_checkouts<S: CampusStore>(
    &self,
    store: &S,
    rows: Vec<LibraryCheckoutRow>,
  ) -> Result<ImportReport> {
    let mut report = ImportReport::default();
    let records = rows
      .into_iter()
      .map(|row| {
        let identifier = row.entity_id.clone();
        self.attribute(
          &mut report,
          IdentifierKind::EntityId,
          Some(&identifier),
          row.timestamp,
          SourcePayload::LibraryCheckout {
            checkout_id: row.checkout_id,
            entity_id:   row.entity_id,
            book_id:     row.book_id,
          },
        )
      })
      .collect();
    report.inserted = store
      .replace_source_records(EventKind::LibraryCheckout, records)
      .await
      .map_err(Error::store)?;
    info!(?report, "library checkout import complete");
    Ok(report)
  }
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};
  use footfall_core::{
    entity::{Profile, Role},
    store::{CampusStore, TimelineQuery},
  };
  use footfall_store_sqlite::SqliteStore;

  use super::*;

  fn student(entity_id: &str, card_id: &str) -> Profile {
    Profile {
      entity_id:   entity_id.to_owned(),
      name:        format!("Person {entity_id}"),
      role:        Role::Student,
      email:       None,
      department:  None,
      student_id:  Some(format!("S-{entity_id}")),
      staff_id:    None,
      card_id:     Some(card_id.to_owned()),
      face_id:     None,
      device_hash: None,
      created_at:  Utc::now(),
    }
  }

  fn event_row(entity_id: &str, location: &str, hour: u32) -> EventRow {
    EventRow {
      entity_id:  Some(entity_id.to_owned()),
      location:   Some(location.to_owned()),
      timestamp:  Utc.with_ymd_and_hms(2025, 3, 10, hour, 0, 0).unwrap(),
      confidence: None,
      event_type: "card_swipes".to_owned(),
    }
  }

  #[tokio::test]
  async fn profile_collision_fails_the_import() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let err = import_profiles(&store, vec![student("E1", "C1"), student("E2", "C1")])
      .await
      .unwrap_err();
    assert!(matches!(
      err,
      Error::Core(footfall_core::Error::IdentifierCollision { .. })
    ));
  }

  #[tokio::test]
  async fn event_rows_with_unknown_entity_stay_unresolved() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    import_profiles(&store, vec![student("E1", "C1")]).await.unwrap();

    let mut stranger = event_row("E9", "Library", 9);
    stranger.entity_id = Some("E9".to_owned());
    let report =
      import_events(&store, vec![event_row("E1", "Library", 9), stranger])
        .await
        .unwrap();

    assert_eq!(report.read, 2);
    assert_eq!(report.resolved, 1);
    assert_eq!(report.inserted, 2); // unresolved events retained for audit
  }

  #[tokio::test]
  async fn swipe_links_to_nearest_preceding_event_exactly_once() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    import_profiles(&store, vec![student("E1", "C1")]).await.unwrap();
    import_events(
      &store,
      vec![event_row("E1", "Library", 9), event_row("E1", "Gym", 17)],
    )
    .await
    .unwrap();

    let importer = Importer::prepare(&store).await.unwrap();
    let report = importer
      .import_card_swipes(&store, vec![CardSwipeRow {
        card_id:     "C1".to_owned(),
        location_id: "Library".to_owned(),
        timestamp:   Utc.with_ymd_and_hms(2025, 3, 10, 10, 30, 0).unwrap(),
      }])
      .await
      .unwrap();
    assert_eq!(report.linked, 1);

    // The linked event shows up exactly once in a window containing it,
    // carrying the swipe as its source detail.
    let window = TimelineQuery {
      start: Some(Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap()),
      end:   Some(Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()),
      kinds: Vec::new(),
    };
    let events = store.events_for_entity("E1", &window).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].location.as_deref(), Some("Library"));

    let sources = store
      .source_records_for_events(&[events[0].event_id])
      .await
      .unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].event_id, Some(events[0].event_id));
  }

  #[tokio::test]
  async fn swipe_before_first_event_is_retained_unlinked() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    import_profiles(&store, vec![student("E1", "C1")]).await.unwrap();
    import_events(&store, vec![event_row("E1", "Library", 9)]).await.unwrap();

    let importer = Importer::prepare(&store).await.unwrap();
    let report = importer
      .import_card_swipes(&store, vec![CardSwipeRow {
        card_id:     "C1".to_owned(),
        location_id: "Gym".to_owned(),
        timestamp:   Utc.with_ymd_and_hms(2025, 3, 10, 6, 0, 0).unwrap(),
      }])
      .await
      .unwrap();

    assert_eq!(report.resolved, 1);
    assert_eq!(report.linked, 0);
    assert_eq!(report.inserted, 1);
  }
}
