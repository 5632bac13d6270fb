//! Handler for `GET /alerts`.
//!
//! Query parameters:
//! - `policy` — `sleep_aware` (default) or `absolute`
//! - `hours` — gap threshold; malformed values silently fall back to the
//!   policy default rather than failing the request

use std::collections::HashMap;

use axum::{
  Json,
  extract::{Query, State},
};
use footfall_analytics::alerts::{
  Alert, DEFAULT_GAP_HOURS, DEFAULT_SLEEP_GAP_HOURS, GapPolicy,
  access_violation_alerts, after_hours_alerts, merge_alerts,
  missing_person_alerts, overcrowding_alerts,
};
use footfall_core::store::CampusStore;
use serde::{Deserialize, Serialize};

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize, Default)]
pub struct AlertParams {
  pub policy: Option<String>,
  pub hours:  Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AlertsResponse {
  pub alerts: Vec<Alert>,
  pub count:  usize,
}

/// Lenient parameter handling: anything unparseable means the default.
fn gap_policy(params: &AlertParams) -> GapPolicy {
  let threshold = params.hours.as_deref().and_then(|h| h.parse::<f64>().ok());
  match params.policy.as_deref() {
    Some("absolute") => GapPolicy::Absolute {
      threshold_hours: threshold.unwrap_or(DEFAULT_GAP_HOURS),
    },
    _ => GapPolicy::SleepAware {
      threshold_hours: threshold.unwrap_or(DEFAULT_SLEEP_GAP_HOURS),
    },
  }
}

/// `GET /alerts[?policy=absolute|sleep_aware][&hours=N]`
pub async fn handler<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<AlertParams>,
) -> Result<Json<AlertsResponse>, ApiError>
where
  S: CampusStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let policy = gap_policy(&params);

  let entity_times = state
    .store
    .entity_event_times()
    .await
    .map_err(ApiError::store)?;
  let profiles = state.store.list_profiles().await.map_err(ApiError::store)?;
  let samples = state.store.all_occupancy().await.map_err(ApiError::store)?;
  let attributed = state
    .store
    .events_with_roles()
    .await
    .map_err(ApiError::store)?;

  let names: HashMap<String, String> = profiles
    .into_iter()
    .map(|p| (p.entity_id, p.name))
    .collect();

  let alerts = merge_alerts(vec![
    missing_person_alerts(&entity_times, &names, policy),
    overcrowding_alerts(&samples, &state.rules),
    access_violation_alerts(&attributed, &state.rules),
    after_hours_alerts(&attributed, &state.rules),
  ]);

  let count = alerts.len();
  Ok(Json(AlertsResponse { alerts, count }))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn malformed_threshold_defaults_silently() {
    let params = AlertParams {
      policy: Some("absolute".into()),
      hours:  Some("twelve".into()),
    };
    assert_eq!(
      gap_policy(&params),
      GapPolicy::Absolute { threshold_hours: DEFAULT_GAP_HOURS }
    );

    let params = AlertParams { policy: None, hours: Some("6".into()) };
    assert_eq!(
      gap_policy(&params),
      GapPolicy::SleepAware { threshold_hours: 6.0 }
    );

    // Unknown policy strings fall back to sleep-aware.
    let params = AlertParams { policy: Some("strict".into()), hours: None };
    assert_eq!(
      gap_policy(&params),
      GapPolicy::SleepAware { threshold_hours: DEFAULT_SLEEP_GAP_HOURS }
    );
  }
}
