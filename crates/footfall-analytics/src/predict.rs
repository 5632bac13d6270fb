//! Next-location prediction — a per-entity classification ensemble over the
//! individual's located event history.
//!
//! An empty history is a valid "no data" result. Fewer than two distinct
//! locations skips training entirely and returns the most recent location
//! deterministically; otherwise a 50-tree classifier predicts the location
//! one hour ahead.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::{
  features::movement_features,
  forest::{ClassificationForest, ForestParams},
};

/// One (timestamp, location) observation from the canonical stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationObservation {
  pub timestamp: DateTime<Utc>,
  pub location:  String,
}

/// Where the predicted location came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "basis", rename_all = "snake_case")]
pub enum NextLocation {
  /// No located events at all.
  NoData,
  /// Under two distinct locations observed: training is skipped and the
  /// most recent location is returned with prediction time = now.
  LastKnown { location: String, at: DateTime<Utc> },
  /// Model-predicted location one hour ahead.
  Modeled { location: String, at: DateTime<Utc> },
}

/// The prediction plus the full history it was derived from, for the
/// explanation collaborator downstream.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionOutcome {
  pub next:    NextLocation,
  pub history: Vec<LocationObservation>,
}

/// Predict the entity's location at `now + 1h` from its located history
/// (ascending by timestamp).
pub fn predict_next_location(
  history: Vec<LocationObservation>,
  now: DateTime<Utc>,
) -> PredictionOutcome {
  let Some(last) = history.last() else {
    return PredictionOutcome { next: NextLocation::NoData, history };
  };

  // Label-encode locations sorted lexicographically, so the encoding is
  // stable across calls with unchanged data.
  let mut labels: Vec<&str> = history.iter().map(|o| o.location.as_str()).collect();
  labels.sort_unstable();
  labels.dedup();

  if labels.len() < 2 {
    let next = NextLocation::LastKnown { location: last.location.clone(), at: now };
    return PredictionOutcome { next, history };
  }

  let x: Vec<Vec<f64>> = history
    .iter()
    .map(|o| movement_features(o.timestamp).to_vec())
    .collect();
  let y: Vec<usize> = history
    .iter()
    .map(|o| labels.binary_search(&o.location.as_str()).unwrap_or(0))
    .collect();

  tracing::debug!(
    observations = history.len(),
    locations = labels.len(),
    "training next-location classifier"
  );
  let forest =
    ClassificationForest::fit(&x, &y, labels.len(), ForestParams::classification());

  let future = now + Duration::hours(1);
  let predicted = forest.predict(&movement_features(future));
  let location = labels[predicted].to_owned();

  PredictionOutcome {
    next: NextLocation::Modeled { location, at: future },
    history,
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn obs(day: u32, hour: u32, location: &str) -> LocationObservation {
    LocationObservation {
      timestamp: Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap(),
      location:  location.to_owned(),
    }
  }

  #[test]
  fn empty_history_reports_no_data() {
    let out = predict_next_location(Vec::new(), Utc::now());
    assert_eq!(out.next, NextLocation::NoData);
    assert!(out.history.is_empty());
  }

  #[test]
  fn single_location_short_circuits_to_last_known() {
    let now = Utc.with_ymd_and_hms(2025, 3, 20, 15, 0, 0).unwrap();
    let history = vec![obs(10, 9, "Library"), obs(11, 9, "Library")];

    let out = predict_next_location(history.clone(), now);
    assert_eq!(
      out.next,
      NextLocation::LastKnown { location: "Library".to_owned(), at: now }
    );

    // Idempotent across repeated calls with unchanged data.
    let again = predict_next_location(history, now);
    assert_eq!(out.next, again.next);
  }

  #[test]
  fn learns_an_hourly_routine() {
    // Three weeks of a fixed routine: mornings in the Library, evenings in
    // the Gym.
    let mut history = Vec::new();
    for day in 1..=21 {
      history.push(obs(day, 9, "Library"));
      history.push(obs(day, 19, "Gym"));
    }

    // now = 08:00, so the model predicts for 09:00.
    let morning = Utc.with_ymd_and_hms(2025, 3, 22, 8, 0, 0).unwrap();
    let out = predict_next_location(history.clone(), morning);
    assert_eq!(
      out.next,
      NextLocation::Modeled {
        location: "Library".to_owned(),
        at:       morning + Duration::hours(1),
      }
    );

    // now = 18:00 → prediction for 19:00.
    let evening = Utc.with_ymd_and_hms(2025, 3, 22, 18, 0, 0).unwrap();
    let out = predict_next_location(history, evening);
    assert!(matches!(
      out.next,
      NextLocation::Modeled { ref location, .. } if location == "Gym"
    ));
  }

  #[test]
  fn returns_the_full_history_for_explanation() {
    let history = vec![obs(10, 9, "Library"), obs(10, 19, "Gym")];
    let out = predict_next_location(history.clone(), Utc::now());
    assert_eq!(out.history, history);
  }
}
