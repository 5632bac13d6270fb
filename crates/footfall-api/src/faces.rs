//! Handler for `POST /search/face`.
//!
//! Body: `{"embedding": [f32; 512]}` — the vector comes from the external
//! face-embedding extractor. The nearest stored embedding wins iff its
//! cosine distance is under the confidence cutoff; a miss is a result, not
//! an error.

use axum::{Json, extract::State};
use footfall_analytics::face::{FaceMatch, MatchOutcome, nearest_match};
use footfall_core::{entity::Profile, store::CampusStore};
use serde::{Deserialize, Serialize};

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct FaceSearchBody {
  pub embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
pub struct FaceSearchResponse {
  pub matched:  bool,
  /// Cosine distance of the nearest candidate, when any embedding is stored.
  pub distance: Option<f64>,
  pub face_id:  Option<String>,
  pub profile:  Option<Profile>,
}

/// `POST /search/face`
pub async fn handler<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<FaceSearchBody>,
) -> Result<Json<FaceSearchResponse>, ApiError>
where
  S: CampusStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let stored = state
    .store
    .all_face_embeddings()
    .await
    .map_err(ApiError::store)?;

  let outcome = nearest_match(&body.embedding, &stored)
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;

  let response = match outcome {
    MatchOutcome::Confident { matched } => {
      let profile = match &matched.entity_id {
        Some(entity_id) => state
          .store
          .get_profile(entity_id)
          .await
          .map_err(ApiError::store)?,
        None => None,
      };
      FaceSearchResponse {
        matched:  true,
        distance: Some(matched.distance),
        face_id:  Some(matched.face_id),
        profile,
      }
    }
    MatchOutcome::NoConfidentMatch { nearest } => FaceSearchResponse {
      matched:  false,
      distance: nearest.as_ref().map(|m: &FaceMatch| m.distance),
      face_id:  None,
      profile:  None,
    },
  };

  Ok(Json(response))
}
