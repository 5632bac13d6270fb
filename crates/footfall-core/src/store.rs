//! The `CampusStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g.
//! `footfall-store-sqlite`). Higher layers (`footfall-ingest`,
//! `footfall-api`) depend on this abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  entity::{Profile, Role},
  event::{Event, EventKind},
  face::FaceEmbedding,
  occupancy::OccupancySample,
  source::SourceRecord,
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Parameters for [`CampusStore::events_for_entity`]. Bounds are inclusive;
/// an empty `kinds` list means no kind filter.
#[derive(Debug, Clone, Default)]
pub struct TimelineQuery {
  pub start: Option<DateTime<Utc>>,
  pub end:   Option<DateTime<Utc>>,
  pub kinds: Vec<EventKind>,
}

/// A lightweight (entity, timestamp, id) triple used to build the event
/// linker's per-entity index without materialising full rows.
#[derive(Debug, Clone)]
pub struct EventRef {
  pub event_id:  Uuid,
  pub entity_id: String,
  pub timestamp: DateTime<Utc>,
}

/// An entity-attributed event joined with the profile's role, for access
/// and after-hours audits.
#[derive(Debug, Clone)]
pub struct AttributedEvent {
  pub event: Event,
  pub role:  Role,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Footfall storage backend.
///
/// Source data is append-only: re-imports are full delete+reload per kind,
/// never incremental patches. Read methods take a snapshot of committed
/// rows; the temporal-join logic upstream must be reproducible from that
/// snapshot alone.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait CampusStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Profiles ──────────────────────────────────────────────────────────

  /// Persist a new profile. The caller is expected to have run
  /// [`Profile::validate`](crate::entity::Profile::validate).
  fn add_profile(
    &self,
    profile: Profile,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Retrieve a profile by canonical id. Returns `None` if not found.
  fn get_profile<'a>(
    &'a self,
    entity_id: &'a str,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send + 'a;

  /// List all profiles, ordered by name.
  fn list_profiles(
    &self,
  ) -> impl Future<Output = Result<Vec<Profile>, Self::Error>> + Send + '_;

  /// Case-insensitive substring search over name, email and every external
  /// identifier, ordered by name and capped at `limit`.
  fn search_profiles<'a>(
    &'a self,
    query: &'a str,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Profile>, Self::Error>> + Send + 'a;

  /// Delete a profile, nulling the entity reference on its events (history
  /// is never cascade-deleted). Returns `false` if the id was unknown.
  fn delete_profile<'a>(
    &'a self,
    entity_id: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  // ── Canonical events ──────────────────────────────────────────────────

  /// Delete all events, then insert the given batch.
  fn replace_events(
    &self,
    events: Vec<Event>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Append a batch of events.
  fn insert_events(
    &self,
    events: Vec<Event>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// An entity's events within the query window, ascending by timestamp.
  fn events_for_entity<'a>(
    &'a self,
    entity_id: &'a str,
    query: &'a TimelineQuery,
  ) -> impl Future<Output = Result<Vec<Event>, Self::Error>> + Send + 'a;

  /// Timestamp of the entity's most recent event, if any.
  fn last_seen<'a>(
    &'a self,
    entity_id: &'a str,
  ) -> impl Future<Output = Result<Option<DateTime<Utc>>, Self::Error>> + Send + 'a;

  /// Every attributed entity's event timestamps, ascending per entity.
  /// Input to the missing-person gap scan.
  fn entity_event_times(
    &self,
  ) -> impl Future<Output = Result<Vec<(String, Vec<DateTime<Utc>>)>, Self::Error>>
  + Send
  + '_;

  /// All attributed events joined with the owning profile's role. Input to
  /// access-violation and after-hours audits.
  fn events_with_roles(
    &self,
  ) -> impl Future<Output = Result<Vec<AttributedEvent>, Self::Error>> + Send + '_;

  /// Lightweight refs of all attributed events, for the linker index.
  fn event_index(
    &self,
  ) -> impl Future<Output = Result<Vec<EventRef>, Self::Error>> + Send + '_;

  // ── Source records ────────────────────────────────────────────────────

  /// Delete all source records of `kind`, then insert the given batch.
  /// Rows violating a per-kind unique key are silently skipped.
  fn replace_source_records(
    &self,
    kind: EventKind,
    records: Vec<SourceRecord>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Source records linked to any of the given events, for timeline
  /// detail joins.
  fn source_records_for_events<'a>(
    &'a self,
    event_ids: &'a [Uuid],
  ) -> impl Future<Output = Result<Vec<SourceRecord>, Self::Error>> + Send + 'a;

  // ── Face embeddings ───────────────────────────────────────────────────

  /// Insert an embedding. Vectors are write-once: returns `false` (and
  /// leaves the stored row untouched) if the face id already exists.
  fn put_face_embedding(
    &self,
    embedding: FaceEmbedding,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn all_face_embeddings(
    &self,
  ) -> impl Future<Output = Result<Vec<FaceEmbedding>, Self::Error>> + Send + '_;

  // ── Occupancy ─────────────────────────────────────────────────────────

  /// Delete all occupancy samples, then insert the given batch. Duplicate
  /// (location, start_time) rows are silently skipped.
  fn replace_occupancy(
    &self,
    samples: Vec<OccupancySample>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// One location's samples, ascending by start time.
  fn occupancy_for_location<'a>(
    &'a self,
    location_id: &'a str,
  ) -> impl Future<Output = Result<Vec<OccupancySample>, Self::Error>> + Send + 'a;

  /// All samples in (location, start_time) order.
  fn all_occupancy(
    &self,
  ) -> impl Future<Output = Result<Vec<OccupancySample>, Self::Error>> + Send + '_;
}
