// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite schema, versioned via `PRAGMA user_version`.

/// Current schema version.
pub(crate) const SCHEMA_VERSION: i64 = 1;

/// Version 1 schema. Additive migrations append new batches keyed off
/// the stored user_version; they never rewrite existing tables.
pub(crate) const SCHEMA_V1: &str = "
CREATE TABLE IF NOT EXISTS projects (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    spec_path          TEXT NOT NULL,
    project_path       TEXT,
    batch_id           TEXT,
    priority           INTEGER NOT NULL DEFAULT 0,
    enqueued_at        INTEGER NOT NULL,
    status             TEXT NOT NULL,
    retry_count        INTEGER NOT NULL DEFAULT 0,
    session_name       TEXT,
    main_pid           INTEGER,
    started_at         INTEGER,
    heartbeat_at       INTEGER,
    timeout_extensions INTEGER NOT NULL DEFAULT 0,
    error_message      TEXT
);

-- Idempotent enqueue: at most one queued/processing row per (spec, path)
CREATE UNIQUE INDEX IF NOT EXISTS projects_active_idx
    ON projects(spec_path, ifnull(project_path, ''))
    WHERE status IN ('queued', 'processing');

-- Admission scan order
CREATE INDEX IF NOT EXISTS projects_claim_idx
    ON projects(status, priority DESC, enqueued_at ASC);

CREATE TABLE IF NOT EXISTS messages (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    agent_session   TEXT NOT NULL,
    project_name    TEXT,
    message         BLOB NOT NULL,
    priority        INTEGER NOT NULL DEFAULT 0,
    sequence_number INTEGER NOT NULL,
    dependency_id   INTEGER,
    status          TEXT NOT NULL DEFAULT 'pending',
    enqueued_at     INTEGER NOT NULL,
    pulled_at       INTEGER,
    delivered_at    INTEGER,
    fifo_scope      TEXT NOT NULL DEFAULT 'agent'
);

-- Pull scan order
CREATE INDEX IF NOT EXISTS messages_pull_idx
    ON messages(agent_session, priority DESC, sequence_number ASC);

CREATE TABLE IF NOT EXISTS agents (
    agent_session           TEXT PRIMARY KEY,
    project_name            TEXT,
    status                  TEXT NOT NULL,
    ready_since             INTEGER,
    last_heartbeat          INTEGER,
    last_sequence_delivered INTEGER,
    restart_count           INTEGER NOT NULL DEFAULT 0,
    last_restart            INTEGER,
    last_error              TEXT,
    context_blob            TEXT
);

CREATE TABLE IF NOT EXISTS agent_snapshots (
    agent_session    TEXT PRIMARY KEY,
    last_briefing    INTEGER,
    briefing_content TEXT NOT NULL DEFAULT '',
    activity_summary TEXT NOT NULL DEFAULT '',
    checkpoint_data  TEXT,
    updated_at       INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS checkin_tasks (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    agent         TEXT NOT NULL,
    next_run_at   INTEGER NOT NULL,
    interval_secs INTEGER NOT NULL,
    note          TEXT NOT NULL DEFAULT '',
    last_run_at   INTEGER,
    cause         TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS checkin_due_idx ON checkin_tasks(next_run_at ASC);

-- Single-row atomic sequence counter for message ordering
CREATE TABLE IF NOT EXISTS sequence_generator (
    id    INTEGER PRIMARY KEY CHECK (id = 1),
    value INTEGER NOT NULL
);
INSERT OR IGNORE INTO sequence_generator (id, value) VALUES (1, 0);

-- Restart history backing the auto-restart budget
CREATE TABLE IF NOT EXISTS restart_log (
    agent_session TEXT NOT NULL,
    restarted_at  INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS restart_log_idx ON restart_log(agent_session, restarted_at);
";

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
