//! Handler for `POST /forecast`.
//!
//! Body: `{"location_id": "...", "future_time": "<RFC 3339>"}`.
//! Retrains the per-location regressor synchronously for each request; a
//! location with no history forecasts zero.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use footfall_analytics::{
  narrative,
  occupancy::{analyze, forecast},
};
use footfall_core::{rules::OccupancyStatus, store::CampusStore};
use serde::{Deserialize, Serialize};

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ForecastBody {
  pub location_id: String,
  pub future_time: String,
}

#[derive(Debug, Serialize)]
pub struct ForecastResponse {
  pub location_name:       String,
  pub future_time:         DateTime<Utc>,
  pub predicted_occupancy: u32,
  pub status:              OccupancyStatus,
  pub explanation:         String,
}

/// `POST /forecast`
pub async fn handler<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<ForecastBody>,
) -> Result<Json<ForecastResponse>, ApiError>
where
  S: CampusStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let future_time = DateTime::parse_from_rfc3339(&body.future_time)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| ApiError::BadRequest(format!("bad future_time: {e}")))?;

  let samples = state
    .store
    .occupancy_for_location(&body.location_id)
    .await
    .map_err(ApiError::store)?;

  // Training is CPU-bound; keep it off the async workers. The model is
  // ephemeral and request-local, so concurrent requests may retrain
  // redundantly but can never share state.
  let location_id = body.location_id.clone();
  let rules = state.rules.clone();
  let (prediction, analysis) = tokio::task::spawn_blocking(move || {
    let prediction = forecast(&location_id, &samples, &rules, future_time);
    let analysis = analyze(&samples, future_time);
    (prediction, analysis)
  })
  .await
  .map_err(ApiError::store)?;

  let explanation = match &analysis {
    None => narrative::EXPLANATION_TOO_THIN.to_owned(),
    Some(analysis) => {
      let context = narrative::render_occupancy_context(
        &body.location_id,
        prediction.predicted,
        analysis,
      );
      state
        .narrator
        .occupancy_rationale(&context)
        .await
        .unwrap_or_else(|| narrative::EXPLANATION_UNAVAILABLE.to_owned())
    }
  };

  Ok(Json(ForecastResponse {
    location_name:       body.location_id,
    future_time,
    predicted_occupancy: prediction.predicted,
    status:              prediction.status,
    explanation,
  }))
}
