//! Handlers for `/entities` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/entities?q=` | Profile search; empty query ⇒ empty list |
//! | `GET`  | `/entities/:id` | Profile + last-seen timestamp, 404 if unknown |
//! | `GET`  | `/entities/:id/timeline` | `?start&end&types`, events + source details |
//! | `GET`  | `/entities/:id/summary` | Stay intervals + generated prose |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use footfall_analytics::{
  narrative,
  timeline::{StayInterval, render_stays, stay_intervals},
};
use footfall_core::{
  entity::Profile,
  event::{Event, EventKind},
  source::SourceRecord,
  store::{CampusStore, TimelineQuery},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, error::ApiError};

const SEARCH_LIMIT: usize = 50;

// ─── Shared parameter parsing ────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct WindowParams {
  pub start: Option<String>,
  pub end:   Option<String>,
  /// Comma-separated event-type discriminants.
  pub types: Option<String>,
}

/// Parse window parameters into a [`TimelineQuery`]. Malformed dates and
/// unknown event types are rejected before any computation starts.
fn parse_window(params: &WindowParams) -> Result<TimelineQuery, ApiError> {
  let parse_dt = |s: &str| -> Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_rfc3339(s)
      .map(|dt| dt.with_timezone(&Utc))
      .map_err(|e| ApiError::BadRequest(format!("bad date {s:?}: {e}")))
  };

  let start = params.start.as_deref().map(parse_dt).transpose()?;
  let end = params.end.as_deref().map(parse_dt).transpose()?;

  let mut kinds = Vec::new();
  if let Some(types) = &params.types {
    for token in types.split(',').map(str::trim).filter(|t| !t.is_empty()) {
      let kind = EventKind::parse(token)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
      kinds.push(kind);
    }
  }

  Ok(TimelineQuery { start, end, kinds })
}

/// Join events with their source records into timeline entries.
fn zip_sources(events: Vec<Event>, mut sources: Vec<SourceRecord>) -> Vec<TimelineEntry> {
  events
    .into_iter()
    .map(|event| {
      let (linked, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut sources)
        .into_iter()
        .partition(|s| s.event_id == Some(event.event_id));
      sources = rest;
      TimelineEntry { event, sources: linked }
    })
    .collect()
}

async fn fetch_timeline<S>(
  state: &AppState<S>,
  entity_id: &str,
  query: &TimelineQuery,
) -> Result<Vec<TimelineEntry>, ApiError>
where
  S: CampusStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let events = state
    .store
    .events_for_entity(entity_id, query)
    .await
    .map_err(ApiError::store)?;
  let ids: Vec<Uuid> = events.iter().map(|e| e.event_id).collect();
  let sources = state
    .store
    .source_records_for_events(&ids)
    .await
    .map_err(ApiError::store)?;
  Ok(zip_sources(events, sources))
}

// ─── Search ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct SearchParams {
  pub q: Option<String>,
}

/// `GET /entities?q=<query>`
pub async fn search<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Profile>>, ApiError>
where
  S: CampusStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let profiles = state
    .store
    .search_profiles(params.q.as_deref().unwrap_or(""), SEARCH_LIMIT)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(profiles))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ProfileDetail {
  #[serde(flatten)]
  pub profile:   Profile,
  pub last_seen: Option<DateTime<Utc>>,
}

/// `GET /entities/:id`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<Json<ProfileDetail>, ApiError>
where
  S: CampusStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let profile = state
    .store
    .get_profile(&id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("profile {id} not found")))?;

  let last_seen = state.store.last_seen(&id).await.map_err(ApiError::store)?;
  Ok(Json(ProfileDetail { profile, last_seen }))
}

// ─── Timeline ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct TimelineEntry {
  #[serde(flatten)]
  pub event:   Event,
  pub sources: Vec<SourceRecord>,
}

/// `GET /entities/:id/timeline[?start&end&types]`
pub async fn timeline<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
  Query(params): Query<WindowParams>,
) -> Result<Json<Vec<TimelineEntry>>, ApiError>
where
  S: CampusStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let query = parse_window(&params)?;

  state
    .store
    .get_profile(&id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("profile {id} not found")))?;

  let entries = fetch_timeline(&state, &id, &query).await?;
  Ok(Json(entries))
}

// ─── Summary ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
  pub entity_id: String,
  pub stays:     Vec<StayInterval>,
  pub summary:   String,
  pub timeline:  Vec<TimelineEntry>,
  /// True when one of the sub-tasks failed and its field is degraded.
  pub partial:   bool,
}

/// `GET /entities/:id/summary[?start&end]`
///
/// The timeline fetch and the narrative generation run as concurrent
/// sub-tasks and are joined before responding. Failure of either degrades
/// its response field; only an unknown profile fails the request, before
/// either sub-task starts.
pub async fn summary<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
  Query(params): Query<WindowParams>,
) -> Result<Json<SummaryResponse>, ApiError>
where
  S: CampusStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let query = parse_window(&params)?;

  state
    .store
    .get_profile(&id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("profile {id} not found")))?;

  let timeline_task = fetch_timeline(&state, &id, &query);

  let narrative_task = async {
    let events = state
      .store
      .events_for_entity(&id, &query)
      .await
      .map_err(ApiError::store)?;

    if !events.iter().any(|e| e.location.is_some()) {
      return Ok::<_, ApiError>((
        Vec::new(),
        narrative::NO_LOCATED_ACTIVITY.to_owned(),
      ));
    }

    let stays = stay_intervals(&events);
    let rendered = render_stays(&stays);
    if rendered.is_empty() {
      return Ok((stays, narrative::SUMMARY_TOO_THIN.to_owned()));
    }

    let summary = state
      .narrator
      .timeline_summary(&rendered)
      .await
      .unwrap_or_else(|| narrative::SUMMARY_UNAVAILABLE.to_owned());
    Ok((stays, summary))
  };

  let (timeline_result, narrative_result) =
    tokio::join!(timeline_task, narrative_task);

  let mut partial = false;
  let timeline = timeline_result.unwrap_or_else(|_| {
    partial = true;
    Vec::new()
  });
  let (stays, summary) = narrative_result.unwrap_or_else(|_| {
    partial = true;
    (Vec::new(), narrative::SUMMARY_UNAVAILABLE.to_owned())
  });

  Ok(Json(SummaryResponse {
    entity_id: id,
    stays,
    summary,
    timeline,
    partial,
  }))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn window_parsing_rejects_bad_dates_and_types() {
    let bad_date = WindowParams {
      start: Some("yesterday".into()),
      ..Default::default()
    };
    assert!(matches!(parse_window(&bad_date), Err(ApiError::BadRequest(_))));

    let bad_type = WindowParams {
      types: Some("wifi_logs,telepathy".into()),
      ..Default::default()
    };
    assert!(matches!(parse_window(&bad_type), Err(ApiError::BadRequest(_))));

    let ok = WindowParams {
      start: Some("2025-03-10T09:00:00Z".into()),
      end:   Some("2025-03-10T18:00:00+00:00".into()),
      types: Some("wifi_logs, card_swipes".into()),
    };
    let query = parse_window(&ok).unwrap();
    assert_eq!(query.kinds.len(), 2);
    assert!(query.start.unwrap() < query.end.unwrap());
  }
}
