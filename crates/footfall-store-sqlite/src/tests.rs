//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{TimeZone, Utc};
use footfall_core::{
  entity::{Profile, Role},
  event::{Event, EventKind},
  face::FaceEmbedding,
  occupancy::OccupancySample,
  source::{SourcePayload, SourceRecord},
  store::{CampusStore, TimelineQuery},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn student(entity_id: &str, name: &str) -> Profile {
  Profile {
    entity_id:   entity_id.to_owned(),
    name:        name.to_owned(),
    role:        Role::Student,
    email:       Some(format!("{entity_id}@campus.example")),
    department:  Some("CSE".into()),
    student_id:  Some(format!("S-{entity_id}")),
    staff_id:    None,
    card_id:     Some(format!("C-{entity_id}")),
    face_id:     Some(format!("F-{entity_id}")),
    device_hash: Some(format!("D-{entity_id}")),
    created_at:  Utc::now(),
  }
}

fn event_at(entity_id: &str, location: &str, hour: u32) -> Event {
  Event::new(
    Some(entity_id.to_owned()),
    Some(location.to_owned()),
    Utc.with_ymd_and_hms(2025, 3, 10, hour, 0, 0).unwrap(),
    1.0,
    EventKind::CardSwipe,
  )
}

// ─── Profiles ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_profile() {
  let s = store().await;

  s.add_profile(student("E1", "Alice Liddell")).await.unwrap();

  let fetched = s.get_profile("E1").await.unwrap();
  assert!(fetched.is_some());
  let fetched = fetched.unwrap();
  assert_eq!(fetched.name, "Alice Liddell");
  assert_eq!(fetched.role, Role::Student);
  assert_eq!(fetched.card_id.as_deref(), Some("C-E1"));
}

#[tokio::test]
async fn get_profile_missing_returns_none() {
  let s = store().await;
  assert!(s.get_profile("ghost").await.unwrap().is_none());
}

#[tokio::test]
async fn search_profiles_matches_identifiers() {
  let s = store().await;
  s.add_profile(student("E1", "Alice Liddell")).await.unwrap();
  s.add_profile(student("E2", "Bob Mallory")).await.unwrap();

  // by name fragment, case-insensitive
  let by_name = s.search_profiles("alice", 50).await.unwrap();
  assert_eq!(by_name.len(), 1);
  assert_eq!(by_name[0].entity_id, "E1");

  // by card id
  let by_card = s.search_profiles("C-E2", 50).await.unwrap();
  assert_eq!(by_card.len(), 1);
  assert_eq!(by_card[0].entity_id, "E2");
}

#[tokio::test]
async fn search_profiles_empty_query_returns_nothing() {
  let s = store().await;
  s.add_profile(student("E1", "Alice Liddell")).await.unwrap();
  assert!(s.search_profiles("   ", 50).await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_profile_nulls_event_reference() {
  let s = store().await;
  s.add_profile(student("E1", "Alice Liddell")).await.unwrap();
  s.insert_events(vec![event_at("E1", "Library", 9)]).await.unwrap();

  assert!(s.delete_profile("E1").await.unwrap());
  assert!(s.get_profile("E1").await.unwrap().is_none());

  // Event history survives, detached from the deleted profile.
  let orphaned = s
    .events_for_entity("E1", &TimelineQuery::default())
    .await
    .unwrap();
  assert!(orphaned.is_empty());
  assert!(s.entity_event_times().await.unwrap().is_empty());
}

// ─── Events ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn events_for_entity_window_and_order() {
  let s = store().await;
  s.add_profile(student("E1", "Alice Liddell")).await.unwrap();
  s.insert_events(vec![
    event_at("E1", "Library", 14),
    event_at("E1", "Cafeteria", 9),
    event_at("E1", "Gym", 19),
  ])
  .await
  .unwrap();

  let query = TimelineQuery {
    start: Some(Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()),
    end:   Some(Utc.with_ymd_and_hms(2025, 3, 10, 15, 0, 0).unwrap()),
    kinds: Vec::new(),
  };
  let events = s.events_for_entity("E1", &query).await.unwrap();

  assert_eq!(events.len(), 2);
  assert!(events[0].timestamp <= events[1].timestamp);
  assert_eq!(events[0].location.as_deref(), Some("Cafeteria"));
  assert_eq!(events[1].location.as_deref(), Some("Library"));
}

#[tokio::test]
async fn events_for_entity_kind_filter() {
  let s = store().await;
  s.add_profile(student("E1", "Alice Liddell")).await.unwrap();

  let mut wifi = event_at("E1", "Library", 10);
  wifi.kind = EventKind::WifiLog;
  s.insert_events(vec![event_at("E1", "Library", 9), wifi])
    .await
    .unwrap();

  let query = TimelineQuery {
    kinds: vec![EventKind::WifiLog],
    ..Default::default()
  };
  let events = s.events_for_entity("E1", &query).await.unwrap();
  assert_eq!(events.len(), 1);
  assert_eq!(events[0].kind, EventKind::WifiLog);
}

#[tokio::test]
async fn replace_events_clears_previous_batch() {
  let s = store().await;
  s.add_profile(student("E1", "Alice Liddell")).await.unwrap();
  s.insert_events(vec![event_at("E1", "Library", 9)]).await.unwrap();

  let n = s.replace_events(vec![event_at("E1", "Gym", 19)]).await.unwrap();
  assert_eq!(n, 1);

  let events = s
    .events_for_entity("E1", &TimelineQuery::default())
    .await
    .unwrap();
  assert_eq!(events.len(), 1);
  assert_eq!(events[0].location.as_deref(), Some("Gym"));
}

#[tokio::test]
async fn last_seen_is_max_timestamp() {
  let s = store().await;
  s.add_profile(student("E1", "Alice Liddell")).await.unwrap();
  s.insert_events(vec![event_at("E1", "Library", 9), event_at("E1", "Gym", 19)])
    .await
    .unwrap();

  let last = s.last_seen("E1").await.unwrap().unwrap();
  assert_eq!(last, Utc.with_ymd_and_hms(2025, 3, 10, 19, 0, 0).unwrap());

  assert!(s.last_seen("ghost").await.unwrap().is_none());
}

#[tokio::test]
async fn entity_event_times_sorted_per_entity() {
  let s = store().await;
  s.add_profile(student("E1", "Alice Liddell")).await.unwrap();
  s.add_profile(student("E2", "Bob Mallory")).await.unwrap();
  s.insert_events(vec![
    event_at("E1", "Gym", 19),
    event_at("E2", "Library", 11),
    event_at("E1", "Library", 9),
  ])
  .await
  .unwrap();

  let times = s.entity_event_times().await.unwrap();
  assert_eq!(times.len(), 2);
  for (_, ts) in &times {
    assert!(ts.windows(2).all(|w| w[0] <= w[1]));
  }
  let e1 = times.iter().find(|(id, _)| id == "E1").unwrap();
  assert_eq!(e1.1.len(), 2);
}

#[tokio::test]
async fn events_with_roles_joins_profile() {
  let s = store().await;
  s.add_profile(student("E1", "Alice Liddell")).await.unwrap();
  s.insert_events(vec![
    event_at("E1", "WORKSHOP", 23),
    // unresolved event: no role join, must not appear
    Event::new(None, Some("WORKSHOP".into()),
      Utc.with_ymd_and_hms(2025, 3, 10, 23, 30, 0).unwrap(), 0.8, EventKind::CctvFrame),
  ])
  .await
  .unwrap();

  let attributed = s.events_with_roles().await.unwrap();
  assert_eq!(attributed.len(), 1);
  assert_eq!(attributed[0].role, Role::Student);
}

// ─── Source records ──────────────────────────────────────────────────────────

#[tokio::test]
async fn replace_source_records_roundtrip() {
  let s = store().await;
  s.add_profile(student("E1", "Alice Liddell")).await.unwrap();
  let ev = event_at("E1", "Library", 9);
  let ev_id = ev.event_id;
  s.insert_events(vec![ev]).await.unwrap();

  let ts = Utc.with_ymd_and_hms(2025, 3, 10, 9, 5, 0).unwrap();
  let record = SourceRecord::new(
    SourcePayload::CardSwipe {
      card_id:     "C-E1".into(),
      location_id: "Library".into(),
    },
    ts,
    Some(ev_id),
  );

  let n = s
    .replace_source_records(EventKind::CardSwipe, vec![record])
    .await
    .unwrap();
  assert_eq!(n, 1);

  let linked = s.source_records_for_events(&[ev_id]).await.unwrap();
  assert_eq!(linked.len(), 1);
  assert_eq!(linked[0].event_id, Some(ev_id));
  assert!(matches!(
    &linked[0].payload,
    SourcePayload::CardSwipe { card_id, .. } if card_id == "C-E1"
  ));
}

#[tokio::test]
async fn replace_source_records_skips_duplicate_keys() {
  let s = store().await;
  let ts = Utc.with_ymd_and_hms(2025, 3, 10, 9, 5, 0).unwrap();
  let make = || {
    SourceRecord::new(
      SourcePayload::WifiLog {
        device_hash: "D-E1".into(),
        ap_id:       "AP-7".into(),
      },
      ts,
      None,
    )
  };

  let n = s
    .replace_source_records(EventKind::WifiLog, vec![make(), make()])
    .await
    .unwrap();
  assert_eq!(n, 1);
}

#[tokio::test]
async fn replace_source_records_only_touches_its_kind() {
  let s = store().await;
  let ts = Utc.with_ymd_and_hms(2025, 3, 10, 9, 5, 0).unwrap();

  s.replace_source_records(
    EventKind::Note,
    vec![SourceRecord::new(
      SourcePayload::Note {
        note_id:   "N1".into(),
        entity_id: "E1".into(),
        category:  None,
        text:      "seen near the gym".into(),
      },
      ts,
      None,
    )],
  )
  .await
  .unwrap();

  // Reloading wifi logs must not disturb the notes.
  let n = s
    .replace_source_records(EventKind::WifiLog, Vec::new())
    .await
    .unwrap();
  assert_eq!(n, 0);
}

// ─── Face embeddings ─────────────────────────────────────────────────────────

#[tokio::test]
async fn face_embedding_write_once() {
  let s = store().await;

  let first =
    FaceEmbedding::new("F-E1".into(), Some("E1".into()), vec![0.5; 512]).unwrap();
  let second =
    FaceEmbedding::new("F-E1".into(), Some("E1".into()), vec![0.9; 512]).unwrap();

  assert!(s.put_face_embedding(first).await.unwrap());
  assert!(!s.put_face_embedding(second).await.unwrap());

  let all = s.all_face_embeddings().await.unwrap();
  assert_eq!(all.len(), 1);
  assert_eq!(all[0].embedding.len(), 512);
  assert!((all[0].embedding[0] - 0.5).abs() < f32::EPSILON);
}

// ─── Occupancy ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn occupancy_replace_and_order() {
  let s = store().await;

  let sample = |h: u32, count: u32| OccupancySample {
    location_id: "Library".into(),
    start_time:  Utc.with_ymd_and_hms(2025, 3, 10, h, 0, 0).unwrap(),
    count,
  };

  s.replace_occupancy(vec![sample(14, 420), sample(9, 120)])
    .await
    .unwrap();

  let samples = s.occupancy_for_location("Library").await.unwrap();
  assert_eq!(samples.len(), 2);
  assert!(samples[0].start_time < samples[1].start_time);
  assert_eq!(samples[0].count, 120);

  assert!(s.occupancy_for_location("Gym").await.unwrap().is_empty());
}

#[tokio::test]
async fn occupancy_duplicate_slot_skipped() {
  let s = store().await;
  let at = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
  let n = s
    .replace_occupancy(vec![
      OccupancySample { location_id: "Gym".into(), start_time: at, count: 10 },
      OccupancySample { location_id: "Gym".into(), start_time: at, count: 12 },
    ])
    .await
    .unwrap();
  assert_eq!(n, 1);
}

// ─── Unresolved events ───────────────────────────────────────────────────────

#[tokio::test]
async fn unresolved_events_are_kept_but_unattributed() {
  let s = store().await;
  let n = s
    .insert_events(vec![Event::new(
      None,
      Some("Main Building".into()),
      Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap(),
      0.6,
      EventKind::CctvFrame,
    )])
    .await
    .unwrap();
  assert_eq!(n, 1);

  assert!(s.entity_event_times().await.unwrap().is_empty());
  assert!(s.event_index().await.unwrap().is_empty());
}

// ─── Ids survive encode/decode ───────────────────────────────────────────────

#[tokio::test]
async fn event_ids_roundtrip() {
  let s = store().await;
  s.add_profile(student("E1", "Alice Liddell")).await.unwrap();
  let ev = event_at("E1", "Library", 9);
  let id: Uuid = ev.event_id;
  s.insert_events(vec![ev]).await.unwrap();

  let events = s
    .events_for_entity("E1", &TimelineQuery::default())
    .await
    .unwrap();
  assert_eq!(events[0].event_id, id);
}
