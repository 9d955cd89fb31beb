//! SQL schema for the roster SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// There is deliberately no cached participant-count column on `sessions`;
/// counts are always derived from the record tables at read time.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
PRAGMA busy_timeout = 5000;

CREATE TABLE IF NOT EXISTS sessions (
    session_id  TEXT PRIMARY KEY,
    owner_id    TEXT NOT NULL,
    capacity    INTEGER NOT NULL CHECK (capacity >= 1),
    starts_at   TEXT NOT NULL,       -- ISO 8601 UTC
    status      TEXT NOT NULL,       -- 'scheduled' | 'in_progress' | 'completed' | 'cancelled'
    version     INTEGER NOT NULL,    -- bumped with every snapshot-changing write
    created_at  TEXT NOT NULL
);

-- One row per (session, member) for the session's whole life.
-- Leave/rejoin flips `state` in place; rows are never deleted.
CREATE TABLE IF NOT EXISTS participations (
    session_id  TEXT NOT NULL REFERENCES sessions(session_id),
    member_id   TEXT NOT NULL,
    state       TEXT NOT NULL,       -- 'joined' | 'left'
    joined_at   TEXT NOT NULL,
    left_at     TEXT,
    PRIMARY KEY (session_id, member_id)
);

-- One row per (session, attendee token); `attending` flips in place.
CREATE TABLE IF NOT EXISTS public_rsvps (
    session_id     TEXT NOT NULL REFERENCES sessions(session_id),
    attendee_token TEXT NOT NULL,
    attending      INTEGER NOT NULL, -- 0 | 1
    confirmed_at   TEXT NOT NULL,
    PRIMARY KEY (session_id, attendee_token)
);

-- Effective transitions only, appended in the same transaction that
-- performed them. No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS participation_log (
    event_id    TEXT PRIMARY KEY,
    session_id  TEXT NOT NULL REFERENCES sessions(session_id),
    actor       TEXT NOT NULL,       -- member uuid or attendee token
    kind        TEXT NOT NULL,       -- 'private' | 'public'
    action      TEXT NOT NULL,       -- 'join' | 'leave'
    recorded_at TEXT NOT NULL,
    version     INTEGER NOT NULL     -- session version after the transition
);

CREATE INDEX IF NOT EXISTS participations_active_idx
    ON participations(session_id, joined_at) WHERE state = 'joined';
CREATE INDEX IF NOT EXISTS public_rsvps_active_idx
    ON public_rsvps(session_id, confirmed_at) WHERE attending = 1;
CREATE INDEX IF NOT EXISTS participation_log_session_idx
    ON participation_log(session_id, version);

PRAGMA user_version = 1;
";
