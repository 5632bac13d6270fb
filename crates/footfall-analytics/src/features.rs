//! Calendar/time feature engineering shared by the forecaster and the
//! next-location predictor.
//!
//! Day-of-week is Monday = 0 … Sunday = 6; the weekend flag covers Saturday
//! and Sunday. The coarse day period buckets the hour into Night [0, 6),
//! Morning [6, 12), Afternoon [12, 18) and Evening [18, 24), lower bound
//! inclusive.

use chrono::{DateTime, Datelike, Timelike, Utc};

/// Number of columns produced by [`forecast_features`].
pub const FORECAST_FEATURES: usize = 13;

/// The coarse 4-bucket time period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayPeriod {
  Night,
  Morning,
  Afternoon,
  Evening,
}

impl DayPeriod {
  pub fn of_hour(hour: u32) -> Self {
    match hour {
      0..=5 => Self::Night,
      6..=11 => Self::Morning,
      12..=17 => Self::Afternoon,
      _ => Self::Evening,
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      Self::Night => "Night",
      Self::Morning => "Morning",
      Self::Afternoon => "Afternoon",
      Self::Evening => "Evening",
    }
  }
}

/// Monday = 0 … Sunday = 6.
pub fn day_of_week(dt: DateTime<Utc>) -> u32 {
  dt.weekday().num_days_from_monday()
}

pub fn is_weekend(dt: DateTime<Utc>) -> bool { day_of_week(dt) >= 5 }

/// Decompose a timestamp into the forecaster's feature vector: year, month,
/// day, hour, minute, day-of-week, weekend flag, ISO week-of-year,
/// minutes-since-midnight, and the one-hot day period.
pub fn forecast_features(dt: DateTime<Utc>) -> [f64; FORECAST_FEATURES] {
  let period = DayPeriod::of_hour(dt.hour());
  [
    dt.year() as f64,
    dt.month() as f64,
    dt.day() as f64,
    dt.hour() as f64,
    dt.minute() as f64,
    day_of_week(dt) as f64,
    is_weekend(dt) as u8 as f64,
    dt.iso_week().week() as f64,
    (dt.hour() * 60 + dt.minute()) as f64,
    (period == DayPeriod::Night) as u8 as f64,
    (period == DayPeriod::Morning) as u8 as f64,
    (period == DayPeriod::Afternoon) as u8 as f64,
    (period == DayPeriod::Evening) as u8 as f64,
  ]
}

/// The next-location predictor's feature vector: hour, day-of-week,
/// weekend flag.
pub fn movement_features(dt: DateTime<Utc>) -> [f64; 3] {
  [
    dt.hour() as f64,
    day_of_week(dt) as f64,
    is_weekend(dt) as u8 as f64,
  ]
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};

  use super::*;

  #[test]
  fn period_buckets_are_lower_inclusive() {
    assert_eq!(DayPeriod::of_hour(0), DayPeriod::Night);
    assert_eq!(DayPeriod::of_hour(5), DayPeriod::Night);
    assert_eq!(DayPeriod::of_hour(6), DayPeriod::Morning);
    assert_eq!(DayPeriod::of_hour(12), DayPeriod::Afternoon);
    assert_eq!(DayPeriod::of_hour(18), DayPeriod::Evening);
    assert_eq!(DayPeriod::of_hour(23), DayPeriod::Evening);
  }

  #[test]
  fn forecast_features_decompose_the_calendar() {
    // Saturday 2025-03-15 14:30 UTC.
    let dt = Utc.with_ymd_and_hms(2025, 3, 15, 14, 30, 0).unwrap();
    let f = forecast_features(dt);

    assert_eq!(f[0], 2025.0);
    assert_eq!(f[1], 3.0);
    assert_eq!(f[2], 15.0);
    assert_eq!(f[3], 14.0);
    assert_eq!(f[4], 30.0);
    assert_eq!(f[5], 5.0); // Saturday
    assert_eq!(f[6], 1.0); // weekend
    assert_eq!(f[8], 14.0 * 60.0 + 30.0);
    // one-hot: Afternoon only
    assert_eq!(&f[9..], &[0.0, 0.0, 1.0, 0.0]);
  }

  #[test]
  fn movement_features_match_forecast_columns() {
    let dt = Utc.with_ymd_and_hms(2025, 3, 12, 9, 0, 0).unwrap(); // Wednesday
    assert_eq!(movement_features(dt), [9.0, 2.0, 0.0]);
  }
}
