//! Timeline reconciliation — turning an entity's event stream into
//! contiguous location-stay intervals.
//!
//! The narrative view forward-fills missing location labels chronologically,
//! drops rows whose location is still undetermined, then collapses
//! consecutive same-location rows into stay intervals. Intervals of one
//! minute or less are suppressed as noise. The rendered text of this
//! collapsed sequence is what the external narrative generator consumes.

use chrono::{DateTime, Utc};
use footfall_core::event::Event;
use serde::Serialize;

/// A contiguous span of time an entity is inferred to have remained at one
/// location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StayInterval {
  pub start:    DateTime<Utc>,
  pub end:      DateTime<Utc>,
  pub location: String,
  pub minutes:  i64,
}

fn minutes_between(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
  ((end - start).num_seconds() as f64 / 60.0).round() as i64
}

/// Collapse an event stream into stay intervals.
///
/// Events may arrive in any order; they are sorted by timestamp first.
/// Locations are forward-filled, so an event without a label inherits the
/// most recent known one; leading label-less events are dropped.
pub fn stay_intervals(events: &[Event]) -> Vec<StayInterval> {
  let mut rows: Vec<(DateTime<Utc>, &str)> = Vec::with_capacity(events.len());
  {
    let mut ordered: Vec<&Event> = events.iter().collect();
    ordered.sort_by_key(|ev| ev.timestamp);

    let mut current: Option<&str> = None;
    for ev in ordered {
      if let Some(loc) = ev.location.as_deref() {
        current = Some(loc);
      }
      if let Some(loc) = current {
        rows.push((ev.timestamp, loc));
      }
    }
  }

  let Some(&(first_ts, first_loc)) = rows.first() else {
    return Vec::new();
  };

  let mut stays = Vec::new();
  let mut start = first_ts;
  let mut location = first_loc;

  let push = |start: DateTime<Utc>, end: DateTime<Utc>, location: &str, out: &mut Vec<StayInterval>| {
    let minutes = minutes_between(start, end);
    if minutes > 1 {
      out.push(StayInterval {
        start,
        end,
        location: location.to_owned(),
        minutes,
      });
    }
  };

  for &(ts, loc) in rows.iter().skip(1) {
    if loc != location {
      push(start, ts, location, &mut stays);
      start = ts;
      location = loc;
    }
  }
  let (last_ts, _) = rows[rows.len() - 1];
  push(start, last_ts, location, &mut stays);

  stays
}

/// The compact textual rendering handed to the narrative generator.
pub fn render_stays(stays: &[StayInterval]) -> String {
  stays
    .iter()
    .map(|stay| {
      format!(
        "From {} to {} ({} minutes), the person was at {}.",
        stay.start.format("%H:%M"),
        stay.end.format("%H:%M"),
        stay.minutes,
        stay.location
      )
    })
    .collect::<Vec<_>>()
    .join(" ")
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};
  use footfall_core::event::{Event, EventKind};

  use super::*;

  fn event(minute_of_day: u32, location: Option<&str>) -> Event {
    Event::new(
      Some("E1".to_owned()),
      location.map(str::to_owned),
      Utc
        .with_ymd_and_hms(2025, 3, 10, minute_of_day / 60, minute_of_day % 60, 0)
        .unwrap(),
      1.0,
      EventKind::CardSwipe,
    )
  }

  #[test]
  fn collapses_consecutive_same_location_rows() {
    let events = vec![
      event(9 * 60, Some("Library")),
      event(9 * 60 + 30, Some("Library")),
      event(11 * 60, Some("Cafeteria")),
      event(12 * 60, Some("Cafeteria")),
    ];
    let stays = stay_intervals(&events);

    assert_eq!(stays.len(), 2);
    assert_eq!(stays[0].location, "Library");
    assert_eq!(stays[0].minutes, 120);
    assert_eq!(stays[1].location, "Cafeteria");
    assert_eq!(stays[1].minutes, 60);
  }

  #[test]
  fn forward_fills_missing_locations() {
    let events = vec![
      event(9 * 60, Some("Library")),
      event(10 * 60, None), // inherits Library
      event(11 * 60, Some("Gym")),
    ];
    let stays = stay_intervals(&events);

    assert_eq!(stays.len(), 1);
    assert_eq!(stays[0].location, "Library");
    assert_eq!(stays[0].minutes, 120);
  }

  #[test]
  fn drops_rows_before_any_known_location() {
    let events = vec![
      event(8 * 60, None),
      event(9 * 60, Some("Library")),
      event(10 * 60, Some("Library")),
    ];
    let stays = stay_intervals(&events);

    assert_eq!(stays.len(), 1);
    assert_eq!(stays[0].start, event(9 * 60, None).timestamp);
  }

  #[test]
  fn suppresses_one_minute_noise() {
    let events = vec![
      event(9 * 60, Some("Library")),
      event(9 * 60 + 1, Some("Corridor")),
      event(9 * 60 + 2, Some("Corridor")),
    ];
    let stays = stay_intervals(&events);

    // Library 09:00→09:01 is one minute: suppressed. Corridor lasts one
    // minute as well: suppressed too.
    assert!(stays.is_empty());
  }

  #[test]
  fn unsorted_input_is_ordered_first() {
    let events = vec![
      event(11 * 60, Some("Gym")),
      event(9 * 60, Some("Library")),
      event(13 * 60, Some("Gym")),
    ];
    let stays = stay_intervals(&events);

    assert_eq!(stays.len(), 2);
    assert!(stays[0].start < stays[1].start);
  }

  #[test]
  fn empty_stream_renders_empty_text() {
    assert!(stay_intervals(&[]).is_empty());
    assert_eq!(render_stays(&[]), "");
  }

  #[test]
  fn renders_the_narrative_input_format() {
    let stays = stay_intervals(&[
      event(9 * 60, Some("Library")),
      event(10 * 60 + 30, Some("Gym")),
      event(12 * 60, Some("Gym")),
    ]);
    let text = render_stays(&stays);

    assert!(text.starts_with("From 09:00 to 10:30 (90 minutes), the person was at Library."));
    assert!(text.contains("the person was at Gym."));
  }
}
