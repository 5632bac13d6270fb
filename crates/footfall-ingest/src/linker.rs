//! Event linker — the temporal join from raw source rows to canonical
//! events.
//!
//! For a source record with resolved entity id and timestamp T, the linked
//! event is the one with the same entity id and the greatest timestamp ≤ T
//! (nearest-preceding-or-equal, never a future event). Each entity's event
//! list is sorted ascending exactly once at build time; that ordering is an
//! invariant of the struct, so `link` is a plain O(log n) binary search.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use footfall_core::store::EventRef;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct EventLinker {
  by_entity: HashMap<String, Vec<(DateTime<Utc>, Uuid)>>,
}

impl EventLinker {
  /// Group event refs per entity and sort each list ascending by timestamp.
  /// The O(n log n) sort is amortised once per import batch.
  pub fn build(events: Vec<EventRef>) -> Self {
    let mut by_entity: HashMap<String, Vec<(DateTime<Utc>, Uuid)>> = HashMap::new();
    for ev in events {
      by_entity
        .entry(ev.entity_id)
        .or_default()
        .push((ev.timestamp, ev.event_id));
    }
    for list in by_entity.values_mut() {
      list.sort_by_key(|(ts, _)| *ts);
    }
    Self { by_entity }
  }

  /// The entity's event with the greatest timestamp ≤ `at`, or `None` if the
  /// entity has no event at or before that instant. When several events
  /// share the maximal qualifying timestamp any one of them is acceptable.
  pub fn link(&self, entity_id: &str, at: DateTime<Utc>) -> Option<Uuid> {
    let list = self.by_entity.get(entity_id)?;
    let idx = list.partition_point(|(ts, _)| *ts <= at);
    if idx == 0 { None } else { Some(list[idx - 1].1) }
  }
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};
  use footfall_core::store::EventRef;
  use uuid::Uuid;

  use super::EventLinker;

  fn refs(entity_id: &str, hours: &[u32]) -> (Vec<EventRef>, Vec<Uuid>) {
    let ids: Vec<Uuid> = hours.iter().map(|_| Uuid::new_v4()).collect();
    let refs = hours
      .iter()
      .zip(&ids)
      .map(|(h, id)| EventRef {
        event_id:  *id,
        entity_id: entity_id.to_owned(),
        timestamp: Utc.with_ymd_and_hms(2025, 3, 10, *h, 0, 0).unwrap(),
      })
      .collect();
    (refs, ids)
  }

  #[test]
  fn links_greatest_preceding_event() {
    let (events, ids) = refs("E1", &[8, 12, 18]);
    let linker = EventLinker::build(events);

    // between 12:00 and 18:00 → the 12:00 event
    let at = Utc.with_ymd_and_hms(2025, 3, 10, 14, 30, 0).unwrap();
    assert_eq!(linker.link("E1", at), Some(ids[1]));
  }

  #[test]
  fn exact_timestamp_links_to_itself() {
    let (events, ids) = refs("E1", &[8, 12, 18]);
    let linker = EventLinker::build(events);

    let at = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
    assert_eq!(linker.link("E1", at), Some(ids[1]));
  }

  #[test]
  fn never_links_a_future_event() {
    let (events, ids) = refs("E1", &[8, 12, 18]);
    let linker = EventLinker::build(events);

    let at = Utc.with_ymd_and_hms(2025, 3, 10, 23, 0, 0).unwrap();
    assert_eq!(linker.link("E1", at), Some(ids[2]));
  }

  #[test]
  fn before_first_event_stays_unlinked() {
    let (events, _) = refs("E1", &[8, 12, 18]);
    let linker = EventLinker::build(events);

    let at = Utc.with_ymd_and_hms(2025, 3, 10, 7, 59, 59).unwrap();
    assert_eq!(linker.link("E1", at), None);
  }

  #[test]
  fn unknown_entity_stays_unlinked() {
    let (events, _) = refs("E1", &[8]);
    let linker = EventLinker::build(events);

    let at = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
    assert_eq!(linker.link("E2", at), None);
  }

  #[test]
  fn build_sorts_unordered_input() {
    let (mut events, ids) = refs("E1", &[18, 8, 12]);
    events.rotate_left(1);
    let linker = EventLinker::build(events);

    let at = Utc.with_ymd_and_hms(2025, 3, 10, 13, 0, 0).unwrap();
    assert_eq!(linker.link("E1", at), Some(ids[2])); // the 12:00 ref
  }
}
