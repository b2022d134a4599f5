// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recurring check-in task operations for the scheduler daemon.

use crate::error::StoreError;
use crate::store::Store;
use gaffer_core::{AgentId, CheckinTask};
use rusqlite::{params, Row};

impl Store {
    pub fn create_checkin(
        &self,
        agent: &AgentId,
        first_run_at: i64,
        interval_secs: i64,
        note: &str,
        cause: &str,
    ) -> Result<i64, StoreError> {
        self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO checkin_tasks (agent, next_run_at, interval_secs, note, cause)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![agent.as_str(), first_run_at, interval_secs, note, cause],
            )?;
            Ok(tx.last_insert_rowid())
        })
    }

    /// Tasks with `next_run_at <= now`, soonest first.
    pub fn due_checkins(&self, now: i64) -> Result<Vec<CheckinTask>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM checkin_tasks WHERE next_run_at <= ?1 ORDER BY next_run_at ASC",
            )?;
            let rows = stmt
                .query_map(params![now], checkin_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Record a fire: `last_run_at = now`, `next_run_at = now + interval`.
    pub fn mark_checkin_fired(&self, id: i64, now: i64) -> Result<(), StoreError> {
        self.with_tx(|tx| {
            let changed = tx.execute(
                "UPDATE checkin_tasks SET last_run_at = ?2, next_run_at = ?2 + interval_secs
                 WHERE id = ?1",
                params![id, now],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("checkin task {id}")));
            }
            Ok(())
        })
    }

    /// Push the next fire out without recording a run (back-off for
    /// credit-exhausted agents).
    pub fn reschedule_checkin(&self, id: i64, next_run_at: i64) -> Result<(), StoreError> {
        self.with_tx(|tx| {
            let changed = tx.execute(
                "UPDATE checkin_tasks SET next_run_at = ?2 WHERE id = ?1",
                params![id, next_run_at],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("checkin task {id}")));
            }
            Ok(())
        })
    }

    pub fn delete_checkin(&self, id: i64) -> Result<(), StoreError> {
        self.with_tx(|tx| {
            tx.execute("DELETE FROM checkin_tasks WHERE id = ?1", params![id])?;
            Ok(())
        })
    }

    /// Drop all tasks addressed to an agent (session reaped).
    pub fn delete_checkins_for_agent(&self, agent: &AgentId) -> Result<usize, StoreError> {
        self.with_tx(|tx| {
            let changed = tx.execute(
                "DELETE FROM checkin_tasks WHERE agent = ?1",
                params![agent.as_str()],
            )?;
            Ok(changed)
        })
    }

    pub fn list_checkins(&self) -> Result<Vec<CheckinTask>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM checkin_tasks ORDER BY next_run_at ASC")?;
            let rows = stmt
                .query_map([], checkin_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn checkin_from_row(row: &Row) -> rusqlite::Result<CheckinTask> {
    let agent: String = row.get("agent")?;
    Ok(CheckinTask {
        id: row.get("id")?,
        agent: AgentId::new(agent),
        next_run_at: row.get("next_run_at")?,
        interval_secs: row.get("interval_secs")?,
        note: row.get("note")?,
        last_run_at: row.get("last_run_at")?,
        cause: row.get("cause")?,
    })
}

#[cfg(test)]
#[path = "checkins_tests.rs"]
mod tests;
