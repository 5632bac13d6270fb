//! JSON REST API for Footfall.
//!
//! Exposes an axum [`Router`] backed by any
//! [`footfall_core::store::CampusStore`]. Auth, TLS, and transport concerns
//! are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", footfall_api::api_router(state))
//! ```

pub mod alerts;
pub mod collaborators;
pub mod entities;
pub mod error;
pub mod faces;
pub mod forecast;
pub mod ingest;
pub mod predict;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use footfall_core::{rules::LocationRules, store::CampusStore};

pub use collaborators::{NarrativeClient, NarrativeConfig};
pub use error::ApiError;

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: CampusStore> {
  pub store:    Arc<S>,
  pub rules:    Arc<LocationRules>,
  pub narrator: Arc<NarrativeClient>,
}

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: CampusStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    // Entities
    .route("/entities", get(entities::search::<S>))
    .route("/entities/{id}", get(entities::get_one::<S>))
    .route("/entities/{id}/timeline", get(entities::timeline::<S>))
    .route("/entities/{id}/summary", get(entities::summary::<S>))
    .route("/entities/{id}/predict", post(predict::handler::<S>))
    // Analytics
    .route("/alerts", get(alerts::handler::<S>))
    .route("/forecast", post(forecast::handler::<S>))
    .route("/search/face", post(faces::handler::<S>))
    // Batch ingestion (the raw-ingestion collaborator posts row batches)
    .route("/ingest/profiles", post(ingest::profiles::<S>))
    .route("/ingest/events", post(ingest::events::<S>))
    .route("/ingest/wifi-logs", post(ingest::wifi_logs::<S>))
    .route("/ingest/card-swipes", post(ingest::card_swipes::<S>))
    .route("/ingest/cctv-frames", post(ingest::cctv_frames::<S>))
    .route("/ingest/notes", post(ingest::notes::<S>))
    .route("/ingest/lab-bookings", post(ingest::lab_bookings::<S>))
    .route("/ingest/library-checkouts", post(ingest::library_checkouts::<S>))
    .route("/ingest/occupancy", post(ingest::occupancy::<S>))
    .route("/ingest/face-embeddings", post(ingest::face_embeddings::<S>))
    .with_state(state)
}
