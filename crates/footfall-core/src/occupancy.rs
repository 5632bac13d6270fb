//! Occupancy samples — per-location head counts at a point in time.
//!
//! Unique on (location, start_time); (location, start_time) ascending is the
//! natural iteration order for feature engineering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OccupancySample {
  pub location_id: String,
  pub start_time:  DateTime<Utc>,
  pub count:       u32,
}
