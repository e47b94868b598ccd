//! SQL schema for the gatelog SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per client-generated event id. Rows are upserted, never deleted.
CREATE TABLE IF NOT EXISTS events (
    event_id           TEXT PRIMARY KEY,
    direction          TEXT NOT NULL,    -- 'entry' | 'exit'
    entity_kind        TEXT NOT NULL,    -- 'pedestrian' | 'vehicle'
    category           TEXT NOT NULL,    -- 'employee' | 'supplier' | 'visitor'
    name               TEXT,
    employee_number    TEXT,
    company            TEXT,
    area               TEXT,
    purpose            TEXT,
    plate              TEXT,
    vehicle_model      TEXT,
    vehicle_color      TEXT,
    scanned_code       TEXT,
    occurred_at        TEXT NOT NULL,    -- fixed-width RFC 3339 UTC; device-assigned
    device_id          TEXT NOT NULL,
    exit_without_entry INTEGER NOT NULL DEFAULT 0,
    received_at        TEXT NOT NULL,    -- first server write
    updated_at         TEXT NOT NULL     -- last server write
);

CREATE INDEX IF NOT EXISTS events_occurred_idx        ON events(occurred_at);
CREATE INDEX IF NOT EXISTS events_plate_idx           ON events(plate);
CREATE INDEX IF NOT EXISTS events_employee_number_idx ON events(employee_number);
CREATE INDEX IF NOT EXISTS events_scanned_code_idx    ON events(scanned_code);
CREATE INDEX IF NOT EXISTS events_device_idx          ON events(device_id, occurred_at);

-- Append-only audit trail of batch submissions.
CREATE TABLE IF NOT EXISTS sync_attempts (
    attempt_id      TEXT PRIMARY KEY,
    device_id       TEXT,
    received_count  INTEGER NOT NULL,
    confirmed_count INTEGER NOT NULL,
    remote_addr     TEXT,
    user_agent      TEXT,
    error           TEXT,
    created_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS sync_attempts_created_idx ON sync_attempts(created_at);

CREATE TABLE IF NOT EXISTS devices (
    device_id    TEXT PRIMARY KEY,
    key_hash     TEXT NOT NULL UNIQUE,  -- hex SHA-256 of the API key
    active       INTEGER NOT NULL DEFAULT 1,
    created_at   TEXT NOT NULL,
    last_seen_at TEXT
);

PRAGMA user_version = 1;
";
