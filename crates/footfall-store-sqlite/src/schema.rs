//! SQL schema for the Footfall SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS profiles (
    entity_id   TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    role        TEXT NOT NULL,   -- 'student' | 'faculty' | 'staff'
    email       TEXT UNIQUE,
    department  TEXT,
    student_id  TEXT UNIQUE,
    staff_id    TEXT UNIQUE,
    card_id     TEXT UNIQUE,
    face_id     TEXT UNIQUE,
    device_hash TEXT UNIQUE,
    created_at  TEXT NOT NULL,
    CHECK ((student_id IS NOT NULL AND staff_id IS NULL)
        OR (student_id IS NULL AND staff_id IS NOT NULL))
);

-- Canonical events. The entity reference is nullable: unresolved events
-- stay for audit, and deleting a profile nulls the reference rather than
-- cascading into history.
CREATE TABLE IF NOT EXISTS events (
    event_id   TEXT PRIMARY KEY,
    entity_id  TEXT REFERENCES profiles(entity_id) ON DELETE SET NULL,
    location   TEXT,
    timestamp  TEXT NOT NULL,   -- ISO 8601 UTC
    confidence REAL NOT NULL DEFAULT 1.0,
    event_type TEXT NOT NULL,   -- discriminant of EventKind
    created_at TEXT NOT NULL
);

-- Raw per-sensor rows as a single closed tagged union. Append-only:
-- re-imports delete a whole source kind and reload it, no UPDATEs.
CREATE TABLE IF NOT EXISTS source_records (
    record_id    TEXT PRIMARY KEY,
    event_id     TEXT REFERENCES events(event_id) ON DELETE SET NULL,
    source_kind  TEXT NOT NULL,  -- discriminant of SourcePayload variant
    timestamp    TEXT NOT NULL,
    payload_json TEXT NOT NULL   -- JSON payload (inner data only)
);

CREATE TABLE IF NOT EXISTS face_embeddings (
    face_id        TEXT PRIMARY KEY,
    entity_id      TEXT REFERENCES profiles(entity_id) ON DELETE SET NULL,
    embedding_json TEXT NOT NULL,  -- JSON array of 512 floats; write-once
    model          TEXT
);

CREATE TABLE IF NOT EXISTS occupancy_data (
    location_id TEXT NOT NULL,
    start_time  TEXT NOT NULL,
    count       INTEGER NOT NULL,
    UNIQUE (location_id, start_time)
);

CREATE INDEX IF NOT EXISTS events_entity_ts_idx  ON events(entity_id, timestamp);
CREATE INDEX IF NOT EXISTS events_type_ts_idx    ON events(event_type, timestamp);
CREATE INDEX IF NOT EXISTS events_ts_idx         ON events(timestamp);
CREATE INDEX IF NOT EXISTS source_event_idx      ON source_records(event_id);
CREATE INDEX IF NOT EXISTS source_kind_ts_idx    ON source_records(source_kind, timestamp);
CREATE INDEX IF NOT EXISTS faces_entity_idx      ON face_embeddings(entity_id);
CREATE INDEX IF NOT EXISTS occupancy_loc_ts_idx  ON occupancy_data(location_id, start_time);

PRAGMA user_version = 1;
";
