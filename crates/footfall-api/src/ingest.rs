//! Handlers for `POST /ingest/*` — the surface the raw-ingestion
//! collaborator posts pre-parsed row batches to.
//!
//! Every batch is a full delete+reload for its source kind (events and
//! occupancy included); profiles and face embeddings are append-only.
//! Identifier collisions fail the batch with a client error and leave the
//! read path untouched.

use axum::{Json, extract::State};
use footfall_core::{
  entity::Profile, occupancy::OccupancySample, store::CampusStore,
};
use footfall_ingest::{
  Importer,
  import::{
    CardSwipeRow, CctvFrameRow, EventRow, ImportReport, LabBookingRow,
    LibraryCheckoutRow, NoteRow, WifiRow, import_events, import_face_embeddings,
    import_occupancy, import_profiles,
  },
};
use serde::{Deserialize, Serialize};

use crate::{AppState, error::ApiError};

#[derive(Debug, Serialize)]
pub struct IngestResponse {
  pub read:     usize,
  pub resolved: usize,
  pub linked:   usize,
  pub inserted: usize,
}

impl From<ImportReport> for IngestResponse {
  fn from(r: ImportReport) -> Self {
    Self {
      read:     r.read,
      resolved: r.resolved,
      linked:   r.linked,
      inserted: r.inserted,
    }
  }
}

fn ingest_error(e: footfall_ingest::Error) -> ApiError {
  match e {
    // Data-integrity failures are the importer's fault, not ours.
    footfall_ingest::Error::Core(core) => ApiError::BadRequest(core.to_string()),
    other => ApiError::Store(Box::new(other)),
  }
}

/// `POST /ingest/profiles`
pub async fn profiles<S>(
  State(state): State<AppState<S>>,
  Json(batch): Json<Vec<Profile>>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: CampusStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let n = import_profiles(state.store.as_ref(), batch)
    .await
    .map_err(ingest_error)?;
  Ok(Json(serde_json::json!({ "inserted": n })))
}

/// `POST /ingest/events`
pub async fn events<S>(
  State(state): State<AppState<S>>,
  Json(batch): Json<Vec<EventRow>>,
) -> Result<Json<IngestResponse>, ApiError>
where
  S: CampusStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let report = import_events(state.store.as_ref(), batch)
    .await
    .map_err(ingest_error)?;
  Ok(Json(report.into()))
}

/// `POST /ingest/occupancy`
pub async fn occupancy<S>(
  State(state): State<AppState<S>>,
  Json(batch): Json<Vec<OccupancySample>>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: CampusStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let n = import_occupancy(state.store.as_ref(), batch)
    .await
    .map_err(ingest_error)?;
  Ok(Json(serde_json::json!({ "inserted": n })))
}

#[derive(Debug, Deserialize)]
pub struct FaceEmbeddingRow {
  pub face_id:   String,
  pub embedding: Vec<f32>,
}

/// `POST /ingest/face-embeddings`
pub async fn face_embeddings<S>(
  State(state): State<AppState<S>>,
  Json(batch): Json<Vec<FaceEmbeddingRow>>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: CampusStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let rows = batch.into_iter().map(|r| (r.face_id, r.embedding)).collect();
  let n = import_face_embeddings(state.store.as_ref(), rows)
    .await
    .map_err(ingest_error)?;
  Ok(Json(serde_json::json!({ "inserted": n })))
}

// ─── Source-record batches ───────────────────────────────────────────────────

/// `POST /ingest/wifi-logs`
pub async fn wifi_logs<S>(
  State(state): State<AppState<S>>,
  Json(batch): Json<Vec<WifiRow>>,
) -> Result<Json<IngestResponse>, ApiError>
where
  S: CampusStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let importer = Importer::prepare(state.store.as_ref())
    .await
    .map_err(ingest_error)?;
  let report = importer
    .import_wifi_logs(state.store.as_ref(), batch)
    .await
    .map_err(ingest_error)?;
  Ok(Json(report.into()))
}

/// `POST /ingest/card-swipes`
pub async fn card_swipes<S>(
  State(state): State<AppState<S>>,
  Json(batch): Json<Vec<CardSwipeRow>>,
) -> Result<Json<IngestResponse>, ApiError>
where
  S: CampusStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let importer = Importer::prepare(state.store.as_ref())
    .await
    .map_err(ingest_error)?;
  let report = importer
    .import_card_swipes(state.store.as_ref(), batch)
    .await
    .map_err(ingest_error)?;
  Ok(Json(report.into()))
}

/// `POST /ingest/cctv-frames`
pub async fn cctv_frames<S>(
  State(state): State<AppState<S>>,
  Json(batch): Json<Vec<CctvFrameRow>>,
) -> Result<Json<IngestResponse>, ApiError>
where
  S: CampusStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let importer = Importer::prepare(state.store.as_ref())
    .await
    .map_err(ingest_error)?;
  let report = importer
    .import_cctv_frames(state.store.as_ref(), batch)
    .await
    .map_err(ingest_error)?;
  Ok(Json(report.into()))
}

/// `POST /ingest/notes`
pub async fn notes<S>(
  State(state): State<AppState<S>>,
  Json(batch): Json<Vec<NoteRow>>,
) -> Result<Json<IngestResponse>, ApiError>
where
  S: CampusStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let importer = Importer::prepare(state.store.as_ref())
    .await
    .map_err(ingest_error)?;
  let report = importer
    .import_notes(state.store.as_ref(), batch)
    .await
    .map_err(ingest_error)?;
  Ok(Json(report.into()))
}

/// `POST /ingest/lab-bookings`
pub async fn lab_bookings<S>(
  State(state): State<AppState<S>>,
  Json(batch): Json<Vec<LabBookingRow>>,
) -> Result<Json<IngestResponse>, ApiError>
where
  S: CampusStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let importer = Importer::prepare(state.store.as_ref())
    .await
    .map_err(ingest_error)?;
  let report = importer
    .import_lab_bookings(state.store.as_ref(), batch)
    .await
    .map_err(ingest_error)?;
  Ok(Json(report.into()))
}

/// `POST /ingest/library-checkouts`
pub async fn library_checkouts<S>(
  State(state): State<AppState<S>>,
  Json(batch): Json<Vec<LibraryCheckoutRow>>,
) -> Result<Json<IngestResponse>, ApiError>
where
  S: CampusStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let importer = Importer::prepare(state.store.as_ref())
    .await
    .map_err(ingest_error)?;
  let report = importer
    .import_library_checkouts(state.store.as_ref(), batch)
    .await
    .map_err(ingest_error)?;
  Ok(Json(report.into()))
}
