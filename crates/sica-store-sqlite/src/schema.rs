//! SQL schema for the SICA SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS students (
    student_key   TEXT PRIMARY KEY,   -- normalised key
    name          TEXT NOT NULL,
    group_label   TEXT NOT NULL,
    access_status TEXT NOT NULL DEFAULT 'active'   -- 'active' | 'blocked'
);

-- Access events are strictly append-only.
CREATE TABLE IF NOT EXISTS access_events (
    event_id    TEXT PRIMARY KEY,
    student_key TEXT,                 -- NULL when the scan matched nobody
    credential  TEXT NOT NULL,
    event_date  TEXT NOT NULL,        -- YYYY-MM-DD, campus local
    event_time  TEXT NOT NULL,        -- HH:MM:SS, campus local
    outcome     TEXT NOT NULL,
    recorded_by TEXT NOT NULL
);

-- At most one grant per student per day, whichever terminal writes first.
CREATE UNIQUE INDEX IF NOT EXISTS access_events_one_grant_per_day
    ON access_events(student_key, event_date)
    WHERE outcome = 'granted';

CREATE INDEX IF NOT EXISTS access_events_key_idx  ON access_events(student_key);
CREATE INDEX IF NOT EXISTS access_events_date_idx ON access_events(event_date);

CREATE TABLE IF NOT EXISTS notices (
    notice_id   TEXT PRIMARY KEY,
    student_key TEXT NOT NULL,
    message     TEXT NOT NULL,
    priority    TEXT NOT NULL,        -- 'low' | 'medium' | 'high'
    active      INTEGER NOT NULL DEFAULT 1,
    created_at  TEXT NOT NULL,        -- RFC 3339 UTC
    created_by  TEXT NOT NULL
);

-- At most one active notice per student.
CREATE UNIQUE INDEX IF NOT EXISTS notices_one_active
    ON notices(student_key)
    WHERE active = 1;

-- Disciplinary records are strictly append-only; tier is fixed at insert.
CREATE TABLE IF NOT EXISTS disciplinary_records (
    record_id   TEXT PRIMARY KEY,
    student_key TEXT NOT NULL,
    category    TEXT NOT NULL,
    description TEXT NOT NULL,
    tier        TEXT NOT NULL,        -- 'first' | 'second' | 'third' | 'report'
    recorded_at TEXT NOT NULL,        -- RFC 3339 UTC
    recorded_by TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS records_key_idx ON disciplinary_records(student_key);

CREATE TABLE IF NOT EXISTS users (
    username     TEXT PRIMARY KEY,
    display_name TEXT NOT NULL,
    role         TEXT NOT NULL,
    pin_hash     TEXT NOT NULL        -- argon2 PHC string
);

PRAGMA user_version = 1;
";
