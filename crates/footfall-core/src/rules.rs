//! Static per-location policy: maximum capacity, allowed roles, and
//! after-hours monitoring.
//!
//! The core does not validate location names against any registry beyond
//! this map. Unknown locations classify as Normal and carry no access
//! restriction.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::entity::Role;

/// Occupancy classification against a location's configured capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OccupancyStatus {
  Overcrowded,
  Underused,
  Normal,
}

/// Policy for one location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationPolicy {
  /// Maximum occupancy; samples above it raise overcrowding alerts.
  pub capacity:      Option<u32>,
  /// If set, only these roles may generate events here; everyone else
  /// raises an access-violation alert.
  pub allowed_roles: Option<Vec<Role>>,
  /// Roles whose presence outside the campus-wide allowed-hours window
  /// raises an after-hours alert at this location.
  pub watch_after_hours: Option<Vec<Role>>,
}

/// The capacity/access-rule table, keyed by location name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationRules {
  locations: HashMap<String, LocationPolicy>,
}

impl LocationRules {
  pub fn new(locations: HashMap<String, LocationPolicy>) -> Self {
    Self { locations }
  }

  pub fn policy(&self, location: &str) -> Option<&LocationPolicy> {
    self.locations.get(location)
  }

  pub fn capacity(&self, location: &str) -> Option<u32> {
    self.policy(location).and_then(|p| p.capacity)
  }

  /// Iterate all locations with a configured capacity.
  pub fn capacities(&self) -> impl Iterator<Item = (&str, u32)> {
    self
      .locations
      .iter()
      .filter_map(|(name, p)| p.capacity.map(|c| (name.as_str(), c)))
  }

  /// Classify a predicted or observed count against the capacity table.
  /// Overcrowded above 90 % of capacity, Underused below 30 %; locations
  /// absent from the table always classify Normal.
  pub fn classify(&self, location: &str, count: u32) -> OccupancyStatus {
    let Some(capacity) = self.capacity(location).filter(|c| *c > 0) else {
      return OccupancyStatus::Normal;
    };
    let ratio = count as f64 / capacity as f64;
    if ratio > 0.9 {
      OccupancyStatus::Overcrowded
    } else if ratio < 0.3 {
      OccupancyStatus::Underused
    } else {
      OccupancyStatus::Normal
    }
  }

  /// The built-in campus table used when the deployment config supplies
  /// none.
  pub fn default_campus() -> Self {
    let restricted = |capacity: u32, roles: &[Role]| LocationPolicy {
      capacity:          Some(capacity),
      allowed_roles:     Some(roles.to_vec()),
      watch_after_hours: Some(vec![Role::Student]),
    };
    let open = |capacity: u32| LocationPolicy {
      capacity:          Some(capacity),
      allowed_roles:     None,
      watch_after_hours: None,
    };

    let mut locations = HashMap::new();
    locations.insert("Admin Lobby".to_owned(), open(600));
    locations.insert("Auditorium".to_owned(), open(300));
    locations.insert("Hostel".to_owned(), open(2300));
    locations.insert("Library".to_owned(), open(1000));
    locations.insert("Seminar Room".to_owned(), open(100));
    locations.insert("Gym".to_owned(), open(500));
    locations.insert("Cafeteria".to_owned(), open(700));
    locations.insert("Main Building".to_owned(), open(300));
    locations.insert(
      "Faculty Office".to_owned(),
      LocationPolicy {
        capacity:          Some(500),
        allowed_roles:     Some(vec![Role::Faculty, Role::Staff]),
        watch_after_hours: None,
      },
    );
    locations.insert("LAB".to_owned(), restricted(25, &[Role::Student, Role::Faculty, Role::Staff]));
    locations.insert("LAB_101".to_owned(), open(130));
    locations.insert("LAB_102".to_owned(), open(15));
    locations.insert("LAB_305".to_owned(), restricted(100, &[Role::Faculty, Role::Staff]));
    locations.insert("LAB_A1".to_owned(), open(180));
    locations.insert("LAB_A2".to_owned(), restricted(8, &[Role::Faculty, Role::Staff]));
    locations.insert("WORKSHOP".to_owned(), restricted(15, &[Role::Faculty, Role::Staff]));

    Self { locations }
  }
}
