//! Handler for `POST /entities/:id/predict`.
//!
//! Trains the per-entity next-location classifier on the individual's
//! located history and predicts one hour ahead. An entity with no located
//! events reports "no data"; with a single distinct location the most
//! recent one is returned without training.

use axum::{
  Json,
  extract::{Path, State},
};
use chrono::Utc;
use footfall_analytics::{
  narrative,
  predict::{LocationObservation, NextLocation, PredictionOutcome, predict_next_location},
};
use footfall_core::store::{CampusStore, TimelineQuery};
use serde::Serialize;

use crate::{AppState, error::ApiError};

#[derive(Debug, Serialize)]
pub struct PredictResponse {
  pub entity_id:   String,
  #[serde(flatten)]
  pub prediction:  NextLocation,
  pub history:     Vec<LocationObservation>,
  pub explanation: String,
}

/// `POST /entities/:id/predict`
pub async fn handler<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<Json<PredictResponse>, ApiError>
where
  S: CampusStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  state
    .store
    .get_profile(&id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("profile {id} not found")))?;

  let events = state
    .store
    .events_for_entity(&id, &TimelineQuery::default())
    .await
    .map_err(ApiError::store)?;

  let history: Vec<LocationObservation> = events
    .into_iter()
    .filter_map(|e| {
      e.location.map(|location| LocationObservation {
        timestamp: e.timestamp,
        location,
      })
    })
    .collect();

  let now = Utc::now();
  let outcome: PredictionOutcome =
    tokio::task::spawn_blocking(move || predict_next_location(history, now))
      .await
      .map_err(ApiError::store)?;

  let explanation = match &outcome.next {
    NextLocation::NoData => {
      "No located activity on record for this entity.".to_owned()
    }
    NextLocation::LastKnown { location, .. } => narrative::prediction_fallback(location),
    NextLocation::Modeled { location, at } => {
      let context =
        narrative::render_prediction_context(&outcome.history, location, *at);
      state
        .narrator
        .prediction_rationale(&context)
        .await
        .unwrap_or_else(|| narrative::prediction_fallback(location))
    }
  };

  Ok(Json(PredictResponse {
    entity_id: id,
    prediction: outcome.next,
    history: outcome.history,
    explanation,
  }))
}
