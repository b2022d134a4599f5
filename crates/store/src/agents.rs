// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent record and context-snapshot operations.

use crate::error::StoreError;
use crate::store::Store;
use gaffer_core::{AgentId, AgentRecord, AgentStatus, ContextSnapshot};
use rusqlite::{params, OptionalExtension, Row};

impl Store {
    pub fn get_agent(&self, agent: &AgentId) -> Result<Option<AgentRecord>, StoreError> {
        self.with_conn(|conn| {
            let record = conn
                .query_row(
                    "SELECT * FROM agents WHERE agent_session = ?1",
                    params![agent.as_str()],
                    agent_from_row,
                )
                .optional()?;
            Ok(record)
        })
    }

    pub fn list_agents(&self) -> Result<Vec<AgentRecord>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM agents ORDER BY agent_session")?;
            let rows = stmt
                .query_map([], agent_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Register an agent without pulling (used by restart recovery).
    pub fn register_agent(
        &self,
        agent: &AgentId,
        project_name: Option<&str>,
        now: i64,
    ) -> Result<(), StoreError> {
        self.with_tx(|tx| crate::messages::upsert_agent_contact(tx, agent, project_name, now))
    }

    /// Set agent status; `ready` stamps `ready_since`.
    pub fn set_agent_status(
        &self,
        agent: &AgentId,
        status: AgentStatus,
        now: i64,
    ) -> Result<(), StoreError> {
        self.with_tx(|tx| {
            let changed = tx.execute(
                "UPDATE agents SET status = ?2,
                     ready_since = CASE WHEN ?2 = 'ready' THEN ?3 ELSE ready_since END,
                     last_heartbeat = ?3
                 WHERE agent_session = ?1",
                params![agent.as_str(), status.to_string(), now],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("agent {agent}")));
            }
            Ok(())
        })
    }

    pub fn set_agent_error(
        &self,
        agent: &AgentId,
        error: &str,
        now: i64,
    ) -> Result<(), StoreError> {
        self.with_tx(|tx| {
            let changed = tx.execute(
                "UPDATE agents SET status = 'error', last_error = ?2, last_heartbeat = ?3
                 WHERE agent_session = ?1",
                params![agent.as_str(), error, now],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("agent {agent}")));
            }
            Ok(())
        })
    }

    /// Record one auto-restart and return restarts within the trailing
    /// window (inclusive of this one).
    pub fn record_restart(
        &self,
        agent: &AgentId,
        window_secs: i64,
        now: i64,
    ) -> Result<u32, StoreError> {
        self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO restart_log (agent_session, restarted_at) VALUES (?1, ?2)",
                params![agent.as_str(), now],
            )?;
            tx.execute(
                "UPDATE agents SET restart_count = restart_count + 1, last_restart = ?2
                 WHERE agent_session = ?1",
                params![agent.as_str(), now],
            )?;
            let count: u32 = tx.query_row(
                "SELECT COUNT(*) FROM restart_log
                 WHERE agent_session = ?1 AND restarted_at > ?2",
                params![agent.as_str(), now - window_secs],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// Restarts in the trailing window without recording a new one.
    pub fn restarts_in_window(
        &self,
        agent: &AgentId,
        window_secs: i64,
        now: i64,
    ) -> Result<u32, StoreError> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM restart_log
                 WHERE agent_session = ?1 AND restarted_at > ?2",
                params![agent.as_str(), now - window_secs],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    pub fn update_context_blob(&self, agent: &AgentId, blob: &str) -> Result<(), StoreError> {
        self.with_tx(|tx| {
            let changed = tx.execute(
                "UPDATE agents SET context_blob = ?2 WHERE agent_session = ?1",
                params![agent.as_str(), blob],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("agent {agent}")));
            }
            Ok(())
        })
    }

    /// Remove an agent row (clean session end).
    pub fn delete_agent(&self, agent: &AgentId) -> Result<(), StoreError> {
        self.with_tx(|tx| {
            tx.execute(
                "DELETE FROM agents WHERE agent_session = ?1",
                params![agent.as_str()],
            )?;
            tx.execute(
                "DELETE FROM restart_log WHERE agent_session = ?1",
                params![agent.as_str()],
            )?;
            Ok(())
        })
    }

    pub fn save_snapshot(&self, snapshot: &ContextSnapshot) -> Result<(), StoreError> {
        self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO agent_snapshots
                     (agent_session, last_briefing, briefing_content, activity_summary,
                      checkpoint_data, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(agent_session) DO UPDATE SET
                     last_briefing = excluded.last_briefing,
                     briefing_content = excluded.briefing_content,
                     activity_summary = excluded.activity_summary,
                     checkpoint_data = excluded.checkpoint_data,
                     updated_at = excluded.updated_at",
                params![
                    snapshot.agent_session.as_str(),
                    snapshot.last_briefing,
                    snapshot.briefing_content,
                    snapshot.activity_summary,
                    snapshot.checkpoint_data,
                    snapshot.updated_at
                ],
            )?;
            Ok(())
        })
    }

    pub fn load_snapshot(&self, agent: &AgentId) -> Result<Option<ContextSnapshot>, StoreError> {
        self.with_conn(|conn| {
            let snapshot = conn
                .query_row(
                    "SELECT * FROM agent_snapshots WHERE agent_session = ?1",
                    params![agent.as_str()],
                    |row| {
                        let agent_session: String = row.get("agent_session")?;
                        Ok(ContextSnapshot {
                            agent_session: AgentId::new(agent_session),
                            last_briefing: row.get("last_briefing")?,
                            briefing_content: row.get("briefing_content")?,
                            activity_summary: row.get("activity_summary")?,
                            checkpoint_data: row.get("checkpoint_data")?,
                            updated_at: row.get("updated_at")?,
                        })
                    },
                )
                .optional()?;
            Ok(snapshot)
        })
    }
}

fn agent_from_row(row: &Row) -> rusqlite::Result<AgentRecord> {
    let status_raw: String = row.get("status")?;
    let status = AgentStatus::parse(&status_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            format!("unknown agent status {status_raw:?}").into(),
        )
    })?;
    let agent_session: String = row.get("agent_session")?;

    Ok(AgentRecord {
        agent_session: AgentId::new(agent_session),
        project_name: row.get("project_name")?,
        status,
        ready_since: row.get("ready_since")?,
        last_heartbeat: row.get("last_heartbeat")?,
        last_sequence_delivered: row.get("last_sequence_delivered")?,
        restart_count: row.get("restart_count")?,
        last_restart: row.get("last_restart")?,
        last_error: row.get("last_error")?,
        context_blob: row.get("context_blob")?,
    })
}

#[cfg(test)]
#[path = "agents_tests.rs"]
mod tests;
