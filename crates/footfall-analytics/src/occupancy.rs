//! Occupancy forecasting — a fresh per-request regression ensemble over one
//! location's historical samples.
//!
//! A location with no history predicts zero; that is a valid result, not an
//! error. Negative raw predictions clip to zero and the result rounds to
//! the nearest integer before classification against the capacity table.

use chrono::{DateTime, Utc};
use footfall_core::{
  occupancy::OccupancySample,
  rules::{LocationRules, OccupancyStatus},
};
use serde::Serialize;

use crate::{
  features::{DayPeriod, day_of_week, forecast_features, is_weekend},
  forest::{ForestParams, RegressionForest},
};

/// A forecast for one location at one future instant.
#[derive(Debug, Clone, Serialize)]
pub struct Forecast {
  pub location_id: String,
  pub future_time: DateTime<Utc>,
  pub predicted:   u32,
  pub status:      OccupancyStatus,
}

/// Train on the location's history and predict the count at `future_time`.
pub fn forecast_count(samples: &[OccupancySample], future_time: DateTime<Utc>) -> u32 {
  if samples.is_empty() {
    return 0;
  }

  let x: Vec<Vec<f64>> = samples
    .iter()
    .map(|s| forecast_features(s.start_time).to_vec())
    .collect();
  let y: Vec<f64> = samples.iter().map(|s| s.count as f64).collect();

  tracing::debug!(samples = samples.len(), "training occupancy regressor");
  let forest = RegressionForest::fit(&x, &y, ForestParams::regression());
  let raw = forest.predict(&forecast_features(future_time));
  raw.max(0.0).round() as u32
}

/// Forecast and classify against the capacity table.
pub fn forecast(
  location_id: &str,
  samples: &[OccupancySample],
  rules: &LocationRules,
  future_time: DateTime<Utc>,
) -> Forecast {
  let predicted = forecast_count(samples, future_time);
  Forecast {
    location_id: location_id.to_owned(),
    future_time,
    predicted,
    status: rules.classify(location_id, predicted),
  }
}

// ─── Historical analysis ─────────────────────────────────────────────────────

/// Aggregates over the location's history around the target instant, handed
/// to the explanation collaborator alongside the prediction.
#[derive(Debug, Clone, Serialize)]
pub struct OccupancyAnalysis {
  pub target_hour:   u32,
  pub target_dow:    u32,
  pub is_weekend:    bool,
  pub period:        &'static str,
  pub avg_count:     f64,
  pub same_hour_avg: f64,
  pub same_dow_avg:  f64,
}

/// `None` when the location has no history to analyse.
pub fn analyze(
  samples: &[OccupancySample],
  future_time: DateTime<Utc>,
) -> Option<OccupancyAnalysis> {
  if samples.is_empty() {
    return None;
  }

  use chrono::Timelike;
  let target_hour = future_time.hour();
  let target_dow = day_of_week(future_time);

  let mean = |counts: &[u32]| -> f64 {
    if counts.is_empty() {
      0.0
    } else {
      counts.iter().map(|&c| c as f64).sum::<f64>() / counts.len() as f64
    }
  };

  let all: Vec<u32> = samples.iter().map(|s| s.count).collect();
  let same_hour: Vec<u32> = samples
    .iter()
    .filter(|s| s.start_time.hour() == target_hour)
    .map(|s| s.count)
    .collect();
  let same_dow: Vec<u32> = samples
    .iter()
    .filter(|s| day_of_week(s.start_time) == target_dow)
    .map(|s| s.count)
    .collect();

  Some(OccupancyAnalysis {
    target_hour,
    target_dow,
    is_weekend: is_weekend(future_time),
    period: DayPeriod::of_hour(target_hour).label(),
    avg_count: mean(&all),
    same_hour_avg: mean(&same_hour),
    same_dow_avg: mean(&same_dow),
  })
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use footfall_core::rules::LocationRules;

  use super::*;

  fn sample(day: u32, hour: u32, count: u32) -> OccupancySample {
    OccupancySample {
      location_id: "Library".to_owned(),
      start_time:  Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap(),
      count,
    }
  }

  #[test]
  fn zero_history_predicts_zero() {
    let future = Utc.with_ymd_and_hms(2025, 3, 20, 14, 0, 0).unwrap();
    assert_eq!(forecast_count(&[], future), 0);

    let f = forecast("Atlantis", &[], &LocationRules::default_campus(), future);
    assert_eq!(f.predicted, 0);
    assert_eq!(f.status, OccupancyStatus::Normal);
  }

  #[test]
  fn forecast_tracks_a_daily_pattern() {
    // Two weeks of a clean daily shape: busy afternoons, quiet mornings.
    let mut samples = Vec::new();
    for day in 1..=14 {
      for hour in [8, 10, 14, 16, 20] {
        let count = match hour {
          8 | 10 => 40,
          14 | 16 => 400,
          _ => 120,
        };
        samples.push(sample(day, hour, count));
      }
    }

    let afternoon = Utc.with_ymd_and_hms(2025, 3, 21, 14, 0, 0).unwrap();
    let morning = Utc.with_ymd_and_hms(2025, 3, 21, 8, 0, 0).unwrap();

    let hot = forecast_count(&samples, afternoon);
    let cold = forecast_count(&samples, morning);
    assert!(hot > cold, "{hot} should exceed {cold}");
    assert!(hot > 200);
    assert!(cold < 150);
  }

  #[test]
  fn forecast_is_deterministic() {
    let samples: Vec<_> = (1..=10).map(|d| sample(d, 14, 100 + d * 3)).collect();
    let future = Utc.with_ymd_and_hms(2025, 3, 21, 14, 0, 0).unwrap();
    assert_eq!(forecast_count(&samples, future), forecast_count(&samples, future));
  }

  #[test]
  fn classification_uses_the_capacity_table() {
    let rules = LocationRules::default_campus();
    // Library capacity is 1000: >90 % overcrowded, <30 % underused.
    assert_eq!(rules.classify("Library", 950), OccupancyStatus::Overcrowded);
    assert_eq!(rules.classify("Library", 100), OccupancyStatus::Underused);
    assert_eq!(rules.classify("Library", 500), OccupancyStatus::Normal);
    assert_eq!(rules.classify("Atlantis", 9999), OccupancyStatus::Normal);
  }

  #[test]
  fn analysis_aggregates_by_hour_and_day() {
    let samples = vec![sample(3, 14, 100), sample(4, 14, 300), sample(4, 9, 50)];
    let future = Utc.with_ymd_and_hms(2025, 3, 21, 14, 0, 0).unwrap();

    let analysis = analyze(&samples, future).unwrap();
    assert_eq!(analysis.target_hour, 14);
    assert_eq!(analysis.period, "Afternoon");
    assert!((analysis.same_hour_avg - 200.0).abs() < 1e-9);
    assert!((analysis.avg_count - 150.0).abs() < 1e-9);

    assert!(analyze(&[], future).is_none());
  }
}
