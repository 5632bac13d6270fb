//! Missing-person, overcrowding, access-violation and after-hours alerts.
//!
//! Each category is computed independently from a snapshot of rows, capped
//! per category, then merged and globally sorted by descending severity.
//! Severity is an integer 1–5.
//!
//! The nightly sleep window and the campus allowed-hours window are fixed
//! policy constants; the gap thresholds arrive per request and fall back to
//! their defaults when the parameter is malformed.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveTime, Timelike, Utc};
use footfall_core::{
  occupancy::OccupancySample,
  rules::LocationRules,
  store::AttributedEvent,
};
use serde::Serialize;

// ─── Policy constants ────────────────────────────────────────────────────────

/// Nightly window excluded by the sleep-aware gap policy: [00:00, 07:00).
pub const SLEEP_START_HOUR: u32 = 0;
pub const SLEEP_END_HOUR: u32 = 7;

/// Campus-wide allowed-hours window: [07:00, 22:00).
pub const ALLOWED_FROM_HOUR: u32 = 7;
pub const ALLOWED_UNTIL_HOUR: u32 = 22;

pub const DEFAULT_GAP_HOURS: f64 = 12.0;
pub const DEFAULT_SLEEP_GAP_HOURS: f64 = 10.0;

pub const MAX_PER_CATEGORY: usize = 100;
pub const MAX_TOTAL: usize = 200;

// ─── Alert types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertCategory {
  MissingPerson,
  Overcrowding,
  AccessViolation,
  AfterHours,
}

/// Structured details per category; serialised alongside the message.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AlertDetails {
  MissingPerson {
    entity_id:            String,
    name:                 String,
    gap_start:            DateTime<Utc>,
    gap_end:              DateTime<Utc>,
    gap_hours:            f64,
    gap_hours_excl_sleep: f64,
  },
  Overcrowding {
    location:      String,
    capacity:      u32,
    count:         u32,
    at:            DateTime<Utc>,
    percent_over:  f64,
  },
  AccessViolation {
    location:  String,
    entity_id: String,
    role:      footfall_core::entity::Role,
    at:        DateTime<Utc>,
  },
  AfterHours {
    location:  String,
    entity_id: String,
    role:      footfall_core::entity::Role,
    at:        DateTime<Utc>,
  },
}

#[derive(Debug, Clone, Serialize)]
pub struct Alert {
  pub category: AlertCategory,
  pub severity: u8,
  pub message:  String,
  pub details:  AlertDetails,
}

// ─── Gap policy ──────────────────────────────────────────────────────────────

/// Missing-person flagging policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GapPolicy {
  /// Flag when the raw gap reaches the threshold.
  Absolute { threshold_hours: f64 },
  /// Subtract time overlapping the nightly sleep window before comparing;
  /// overnight inactivity is expected and must not trigger false alerts.
  SleepAware { threshold_hours: f64 },
}

impl Default for GapPolicy {
  fn default() -> Self {
    Self::SleepAware { threshold_hours: DEFAULT_SLEEP_GAP_HOURS }
  }
}

impl GapPolicy {
  pub fn threshold_hours(self) -> f64 {
    match self {
      Self::Absolute { threshold_hours } | Self::SleepAware { threshold_hours } => {
        threshold_hours
      }
    }
  }
}

/// Time within [start, end] that falls inside a nightly [00:00, 07:00)
/// window, iterating every day boundary the gap crosses.
pub fn sleep_overlap(start: DateTime<Utc>, end: DateTime<Utc>) -> Duration {
  if end <= start {
    return Duration::zero();
  }
  let sleep_start = NaiveTime::from_hms_opt(SLEEP_START_HOUR, 0, 0).unwrap();
  let sleep_end = NaiveTime::from_hms_opt(SLEEP_END_HOUR, 0, 0).unwrap();

  let mut total = Duration::zero();
  let mut day = start.date_naive();
  let last = end.date_naive();
  while day <= last {
    let window_start = day.and_time(sleep_start).and_utc();
    let window_end = day.and_time(sleep_end).and_utc();
    let lo = start.max(window_start);
    let hi = end.min(window_end);
    if hi > lo {
      total += hi - lo;
    }
    let Some(next) = day.succ_opt() else { break };
    day = next;
  }
  total
}

fn hours(d: Duration) -> f64 { d.num_seconds() as f64 / 3600.0 }

fn gap_severity(effective_hours: f64, threshold: f64) -> u8 {
  if effective_hours >= 2.0 * threshold {
    5
  } else if effective_hours >= 1.5 * threshold {
    4
  } else {
    3
  }
}

/// Scan each entity's ascending timestamp sequence for inactivity gaps.
/// `names` maps entity id to display name; unknown ids fall back to the id.
pub fn missing_person_alerts(
  entity_times: &[(String, Vec<DateTime<Utc>>)],
  names: &HashMap<String, String>,
  policy: GapPolicy,
) -> Vec<Alert> {
  let threshold = policy.threshold_hours();
  let mut alerts = Vec::new();

  for (entity_id, times) in entity_times {
    for pair in times.windows(2) {
      let (start, end) = (pair[0], pair[1]);
      let raw = hours(end - start);
      let excl_sleep = raw - hours(sleep_overlap(start, end));
      let effective = match policy {
        GapPolicy::Absolute { .. } => raw,
        GapPolicy::SleepAware { .. } => excl_sleep,
      };
      if effective < threshold {
        continue;
      }

      let name = names.get(entity_id).cloned().unwrap_or_else(|| entity_id.clone());
      alerts.push(Alert {
        category: AlertCategory::MissingPerson,
        severity: gap_severity(effective, threshold),
        message:  format!(
          "{name} unobserved for {effective:.1} hours between {} and {}",
          start.to_rfc3339(),
          end.to_rfc3339()
        ),
        details:  AlertDetails::MissingPerson {
          entity_id:            entity_id.clone(),
          name,
          gap_start:            start,
          gap_end:              end,
          gap_hours:            raw,
          gap_hours_excl_sleep: excl_sleep,
        },
      });
    }
  }

  alerts
}

// ─── Occupancy and policy audits ─────────────────────────────────────────────

fn overcrowding_severity(percent_of_capacity: f64) -> u8 {
  if percent_of_capacity > 200.0 {
    5
  } else if percent_of_capacity > 150.0 {
    4
  } else if percent_of_capacity > 120.0 {
    3
  } else {
    2
  }
}

/// Every historical sample exceeding the location's configured capacity.
pub fn overcrowding_alerts(
  samples: &[OccupancySample],
  rules: &LocationRules,
) -> Vec<Alert> {
  let mut alerts = Vec::new();
  for sample in samples {
    let Some(capacity) = rules.capacity(&sample.location_id).filter(|c| *c > 0) else {
      continue;
    };
    if sample.count <= capacity {
      continue;
    }
    let percent = sample.count as f64 / capacity as f64 * 100.0;
    alerts.push(Alert {
      category: AlertCategory::Overcrowding,
      severity: overcrowding_severity(percent),
      message:  format!(
        "{} held {} people against a capacity of {} ({percent:.0}% of capacity)",
        sample.location_id, sample.count, capacity
      ),
      details:  AlertDetails::Overcrowding {
        location:     sample.location_id.clone(),
        capacity,
        count:        sample.count,
        at:           sample.start_time,
        percent_over: percent - 100.0,
      },
    });
  }
  alerts
}

/// Events at access-restricted locations by entities whose role is outside
/// the allowed set.
pub fn access_violation_alerts(
  events: &[AttributedEvent],
  rules: &LocationRules,
) -> Vec<Alert> {
  let mut alerts = Vec::new();
  for attributed in events {
    let Some(location) = attributed.event.location.as_deref() else { continue };
    let Some(allowed) = rules.policy(location).and_then(|p| p.allowed_roles.as_ref())
    else {
      continue;
    };
    if allowed.contains(&attributed.role) {
      continue;
    }
    let entity_id = attributed.event.entity_id.clone().unwrap_or_default();
    alerts.push(Alert {
      category: AlertCategory::AccessViolation,
      severity: 4,
      message:  format!(
        "{entity_id} ({:?}) generated activity at restricted location {location}",
        attributed.role
      ),
      details:  AlertDetails::AccessViolation {
        location:  location.to_owned(),
        entity_id,
        role:      attributed.role,
        at:        attributed.event.timestamp,
      },
    });
  }
  alerts
}

/// Events by watched roles at configured locations outside the campus
/// allowed-hours window.
pub fn after_hours_alerts(
  events: &[AttributedEvent],
  rules: &LocationRules,
) -> Vec<Alert> {
  let mut alerts = Vec::new();
  for attributed in events {
    let Some(location) = attributed.event.location.as_deref() else { continue };
    let Some(watched) =
      rules.policy(location).and_then(|p| p.watch_after_hours.as_ref())
    else {
      continue;
    };
    if !watched.contains(&attributed.role) {
      continue;
    }
    let hour = attributed.event.timestamp.hour();
    if (ALLOWED_FROM_HOUR..ALLOWED_UNTIL_HOUR).contains(&hour) {
      continue;
    }
    let entity_id = attributed.event.entity_id.clone().unwrap_or_default();
    alerts.push(Alert {
      category: AlertCategory::AfterHours,
      severity: 2,
      message:  format!(
        "{entity_id} ({:?}) active at {location} outside allowed hours",
        attributed.role
      ),
      details:  AlertDetails::AfterHours {
        location:  location.to_owned(),
        entity_id,
        role:      attributed.role,
        at:        attributed.event.timestamp,
      },
    });
  }
  alerts
}

// ─── Merge ───────────────────────────────────────────────────────────────────

/// Cap each category, merge, sort by descending severity (stable, so ties
/// keep category order) and cap the total.
pub fn merge_alerts(categories: Vec<Vec<Alert>>) -> Vec<Alert> {
  let mut merged = Vec::new();
  for mut list in categories {
    list.sort_by(|a, b| b.severity.cmp(&a.severity));
    list.truncate(MAX_PER_CATEGORY);
    merged.extend(list);
  }
  merged.sort_by(|a, b| b.severity.cmp(&a.severity));
  merged.truncate(MAX_TOTAL);
  merged
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use footfall_core::{
    entity::Role,
    event::{Event, EventKind},
    rules::{LocationPolicy, LocationRules},
  };

  use super::*;

  fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, day, hour, minute, 0).unwrap()
  }

  #[test]
  fn sleep_overlap_subtracts_each_crossed_night() {
    // 2025-01-01T20:00 → 2025-01-03T09:00 crosses two full nightly windows.
    let overlap = sleep_overlap(at(1, 20, 0), at(3, 9, 0));
    assert_eq!(overlap, Duration::hours(14));
  }

  #[test]
  fn sleep_aware_gap_matches_worked_example() {
    // Raw gap 37 h, minus two 7 h windows = 23 h.
    let times = vec![("E1".to_owned(), vec![at(1, 20, 0), at(3, 9, 0)])];
    let alerts = missing_person_alerts(
      &times,
      &HashMap::new(),
      GapPolicy::SleepAware { threshold_hours: DEFAULT_SLEEP_GAP_HOURS },
    );

    assert_eq!(alerts.len(), 1);
    let AlertDetails::MissingPerson { gap_hours, gap_hours_excl_sleep, .. } =
      &alerts[0].details
    else {
      panic!("wrong detail variant");
    };
    assert!((gap_hours - 37.0).abs() < 1e-9);
    assert!((gap_hours_excl_sleep - 23.0).abs() < 1e-9);
  }

  #[test]
  fn gap_entirely_inside_sleep_window_is_not_flagged() {
    let times = vec![("E1".to_owned(), vec![at(1, 23, 0), at(2, 10, 0)])];
    // Raw 11 h, minus 7 h of nightly window = 4 h effective.
    let alerts = missing_person_alerts(
      &times,
      &HashMap::new(),
      GapPolicy::SleepAware { threshold_hours: DEFAULT_SLEEP_GAP_HOURS },
    );
    assert!(alerts.is_empty());

    // The absolute policy at a 10 h threshold does flag the same gap.
    let alerts = missing_person_alerts(
      &times,
      &HashMap::new(),
      GapPolicy::Absolute { threshold_hours: 10.0 },
    );
    assert_eq!(alerts.len(), 1);
  }

  #[test]
  fn short_gaps_are_ignored() {
    let times = vec![("E1".to_owned(), vec![at(1, 9, 0), at(1, 11, 0), at(1, 15, 0)])];
    let alerts =
      missing_person_alerts(&times, &HashMap::new(), GapPolicy::default());
    assert!(alerts.is_empty());
  }

  fn capacity_only(location: &str, capacity: u32) -> LocationRules {
    let mut map = std::collections::HashMap::new();
    map.insert(location.to_owned(), LocationPolicy {
      capacity:          Some(capacity),
      allowed_roles:     None,
      watch_after_hours: None,
    });
    LocationRules::new(map)
  }

  fn sample(location: &str, count: u32) -> OccupancySample {
    OccupancySample {
      location_id: location.to_owned(),
      start_time:  at(1, 9, 0),
      count,
    }
  }

  #[test]
  fn overcrowding_severity_buckets_scale_and_cap() {
    let rules = capacity_only("LAB", 100);
    let severities: Vec<u8> =
      overcrowding_alerts(&[sample("LAB", 110), sample("LAB", 130), sample("LAB", 160), sample("LAB", 500)], &rules)
        .into_iter()
        .map(|a| a.severity)
        .collect();
    assert_eq!(severities, vec![2, 3, 4, 5]);
  }

  #[test]
  fn overcrowding_skips_unknown_locations_and_within_capacity() {
    let rules = capacity_only("LAB", 100);
    let alerts =
      overcrowding_alerts(&[sample("LAB", 100), sample("Atrium", 9999)], &rules);
    assert!(alerts.is_empty());
  }

  fn attributed(location: &str, hour: u32, role: Role) -> AttributedEvent {
    AttributedEvent {
      event: Event::new(
        Some("E1".to_owned()),
        Some(location.to_owned()),
        at(1, hour, 0),
        1.0,
        EventKind::CardSwipe,
      ),
      role,
    }
  }

  #[test]
  fn access_violations_flag_disallowed_roles_only() {
    let mut map = std::collections::HashMap::new();
    map.insert("WORKSHOP".to_owned(), LocationPolicy {
      capacity:          None,
      allowed_roles:     Some(vec![Role::Faculty, Role::Staff]),
      watch_after_hours: None,
    });
    let rules = LocationRules::new(map);

    let alerts = access_violation_alerts(
      &[
        attributed("WORKSHOP", 10, Role::Student),
        attributed("WORKSHOP", 10, Role::Faculty),
        attributed("Library", 10, Role::Student),
      ],
      &rules,
    );
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].severity, 4);
  }

  #[test]
  fn after_hours_flags_watched_roles_outside_the_window() {
    let mut map = std::collections::HashMap::new();
    map.insert("LAB".to_owned(), LocationPolicy {
      capacity:          None,
      allowed_roles:     None,
      watch_after_hours: Some(vec![Role::Student]),
    });
    let rules = LocationRules::new(map);

    let alerts = after_hours_alerts(
      &[
        attributed("LAB", 23, Role::Student), // flagged
        attributed("LAB", 6, Role::Student),  // flagged
        attributed("LAB", 7, Role::Student),  // boundary: allowed
        attributed("LAB", 21, Role::Student), // allowed
        attributed("LAB", 23, Role::Faculty), // not watched
      ],
      &rules,
    );
    assert_eq!(alerts.len(), 2);
  }

  #[test]
  fn merged_alerts_sort_descending_and_cap() {
    let make = |severity: u8| Alert {
      category: AlertCategory::Overcrowding,
      severity,
      message:  String::new(),
      details:  AlertDetails::Overcrowding {
        location:     "LAB".into(),
        capacity:     1,
        count:        2,
        at:           at(1, 9, 0),
        percent_over: 100.0,
      },
    };

    let merged = merge_alerts(vec![vec![make(2), make(5)], vec![make(4), make(3)]]);
    let severities: Vec<u8> = merged.iter().map(|a| a.severity).collect();
    assert_eq!(severities, vec![5, 4, 3, 2]);
    assert!(severities.windows(2).all(|w| w[0] >= w[1]));
  }
}
