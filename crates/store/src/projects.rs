// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project queue operations: idempotent enqueue, serial admission,
//! guarded transitions, heartbeats, and recovery queries.

use crate::error::StoreError;
use crate::store::Store;
use gaffer_core::{Project, ProjectId, ProjectStatus};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{error, info, warn};

/// Optional fields applied alongside a status transition.
#[derive(Debug, Default, Clone)]
pub struct TransitionUpdate {
    pub session_name: Option<String>,
    pub main_pid: Option<i32>,
    pub error_message: Option<String>,
}

impl TransitionUpdate {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error_message: Some(message.into()),
            ..Self::default()
        }
    }
}

/// Row counts per project status.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

/// Store summary for `recovery diagnostics`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DiagnosticsSummary {
    pub projects: Vec<StatusCount>,
    pub messages: Vec<StatusCount>,
    pub agents: Vec<StatusCount>,
    pub checkin_tasks: i64,
}

impl Store {
    /// Idempotent enqueue: an existing `queued|processing` row for the
    /// same `(spec_path, project_path)` wins and its id is returned.
    pub fn enqueue_project(
        &self,
        spec_path: &str,
        project_path: Option<&str>,
        priority: i64,
        batch_id: Option<&str>,
        now: i64,
    ) -> Result<ProjectId, StoreError> {
        self.with_tx(|tx| {
            if let Some(id) = find_active(tx, spec_path, project_path)? {
                return Ok(id);
            }

            let inserted = tx.execute(
                "INSERT INTO projects (spec_path, project_path, batch_id, priority, enqueued_at, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, 'queued')",
                params![spec_path, project_path, batch_id, priority, now],
            );

            match inserted {
                Ok(_) => Ok(tx.last_insert_rowid()),
                // Unique-index backstop: another writer won the race
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    find_active(tx, spec_path, project_path)?
                        .ok_or_else(|| StoreError::NotFound(format!("project for {spec_path}")))
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Atomic "select next queued and set processing".
    ///
    /// Returns `None` when any project already holds the admission slot
    /// (`processing`, `timing_out`, or `credit_paused`).
    pub fn claim_next_project(&self, now: i64) -> Result<Option<Project>, StoreError> {
        self.with_tx(|tx| {
            let active: i64 = tx.query_row(
                "SELECT COUNT(*) FROM projects
                 WHERE status IN ('processing', 'timing_out', 'credit_paused')",
                [],
                |row| row.get(0),
            )?;
            if active > 0 {
                return Ok(None);
            }

            let candidate = tx
                .query_row(
                    "SELECT * FROM projects WHERE status = 'queued'
                     ORDER BY priority DESC, enqueued_at ASC, id ASC LIMIT 1",
                    [],
                    project_from_row,
                )
                .optional()?;

            let Some(project) = candidate else {
                return Ok(None);
            };

            tx.execute(
                "UPDATE projects SET status = 'processing', started_at = ?2, heartbeat_at = ?2
                 WHERE id = ?1",
                params![project.id, now],
            )?;

            get_required(tx, project.id).map(Some)
        })
    }

    /// Transition a project, validating legality against the state
    /// machine. Terminal rows reject all mutation.
    pub fn transition_project(
        &self,
        id: ProjectId,
        to: ProjectStatus,
        update: TransitionUpdate,
        now: i64,
    ) -> Result<Project, StoreError> {
        self.with_tx(|tx| {
            let project = get_required(tx, id)?;
            if !project.status.can_transition_to(to) {
                return Err(StoreError::IllegalTransition {
                    from: project.status,
                    to,
                });
            }

            tx.execute(
                "UPDATE projects SET
                     status = ?2,
                     session_name = coalesce(?3, session_name),
                     main_pid = coalesce(?4, main_pid),
                     error_message = coalesce(?5, error_message),
                     heartbeat_at = ?6
                 WHERE id = ?1",
                params![
                    id,
                    to.to_string(),
                    update.session_name,
                    update.main_pid,
                    update.error_message,
                    now
                ],
            )?;

            info!(project_id = id, from = %project.status, to = %to, "project transition");
            get_required(tx, id)
        })
    }

    /// Record supervision details on a non-terminal row.
    pub fn record_supervision(
        &self,
        id: ProjectId,
        session_name: Option<&str>,
        main_pid: Option<i32>,
    ) -> Result<(), StoreError> {
        self.with_tx(|tx| {
            let changed = tx.execute(
                "UPDATE projects SET
                     session_name = coalesce(?2, session_name),
                     main_pid = coalesce(?3, main_pid)
                 WHERE id = ?1 AND status NOT IN ('completed', 'failed')",
                params![id, session_name, main_pid],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("active project {id}")));
            }
            Ok(())
        })
    }

    /// Freshen the heartbeat of a non-terminal row.
    pub fn heartbeat(&self, id: ProjectId, now: i64) -> Result<(), StoreError> {
        self.with_tx(|tx| {
            tx.execute(
                "UPDATE projects SET heartbeat_at = ?2
                 WHERE id = ?1 AND status NOT IN ('completed', 'failed')",
                params![id, now],
            )?;
            Ok(())
        })
    }

    /// Grant a timeout extension, returning the new extension count.
    pub fn extend_timeout(&self, id: ProjectId, now: i64) -> Result<u32, StoreError> {
        self.with_tx(|tx| {
            tx.execute(
                "UPDATE projects SET timeout_extensions = timeout_extensions + 1, heartbeat_at = ?2
                 WHERE id = ?1 AND status NOT IN ('completed', 'failed')",
                params![id, now],
            )?;
            Ok(get_required(tx, id)?.timeout_extensions)
        })
    }

    /// Self-heal pass for the admission invariant: if more than one row
    /// holds the slot, keep the most recently started and demote the
    /// rest back to `queued`.
    ///
    /// Writes directly, bypassing transition legality: this is
    /// invariant repair, not a state-machine move.
    pub fn heal_admission(&self) -> Result<Vec<ProjectId>, StoreError> {
        self.with_tx(|tx| {
            let mut stmt = tx.prepare(
                "SELECT id FROM projects
                 WHERE status IN ('processing', 'timing_out', 'credit_paused')
                 ORDER BY started_at DESC, id DESC",
            )?;
            let ids: Vec<ProjectId> = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<_, _>>()?;

            if ids.len() <= 1 {
                return Ok(Vec::new());
            }

            error!(count = ids.len(), "admission invariant violated; demoting extras to queued");
            let demoted: Vec<ProjectId> = ids[1..].to_vec();
            for id in &demoted {
                tx.execute(
                    "UPDATE projects SET status = 'queued', started_at = NULL,
                         heartbeat_at = NULL, main_pid = NULL
                     WHERE id = ?1",
                    params![id],
                )?;
            }
            Ok(demoted)
        })
    }

    /// Force a stuck row back to `queued` (or `failed`). Recovery-CLI
    /// path; `force` permits resetting even terminal rows.
    pub fn reset_project(
        &self,
        id: ProjectId,
        to_failed: bool,
        force: bool,
        now: i64,
    ) -> Result<Project, StoreError> {
        self.with_tx(|tx| {
            let project = get_required(tx, id)?;
            if project.status.is_terminal() && !force {
                return Err(StoreError::IllegalTransition {
                    from: project.status,
                    to: if to_failed {
                        ProjectStatus::Failed
                    } else {
                        ProjectStatus::Queued
                    },
                });
            }

            if to_failed {
                tx.execute(
                    "UPDATE projects SET status = 'failed',
                         error_message = coalesce(error_message, 'reset by operator'),
                         heartbeat_at = ?2
                     WHERE id = ?1",
                    params![id, now],
                )?;
            } else {
                tx.execute(
                    "UPDATE projects SET status = 'queued', session_name = NULL,
                         main_pid = NULL, started_at = NULL, heartbeat_at = NULL,
                         error_message = NULL, timeout_extensions = 0,
                         retry_count = retry_count + 1
                     WHERE id = ?1",
                    params![id],
                )?;
            }

            warn!(project_id = id, to_failed, force, "project reset by operator");
            get_required(tx, id)
        })
    }

    pub fn get_project(&self, id: ProjectId) -> Result<Project, StoreError> {
        self.with_conn(|conn| get_required(conn, id))
    }

    /// List rows, optionally filtered by status, newest first.
    pub fn list_projects(
        &self,
        status: Option<ProjectStatus>,
    ) -> Result<Vec<Project>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM projects
                 WHERE (?1 IS NULL OR status = ?1)
                 ORDER BY id DESC",
            )?;
            let rows = stmt
                .query_map(params![status.map(|s| s.to_string())], project_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Rows needing operator attention: `zombie`, `timing_out`, and
    /// `processing` with no recorded session.
    pub fn list_stuck(&self) -> Result<Vec<Project>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM projects
                 WHERE status IN ('zombie', 'timing_out')
                    OR (status = 'processing' AND session_name IS NULL)
                 ORDER BY id ASC",
            )?;
            let rows = stmt
                .query_map([], project_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// All rows currently occupying or contending for the admission slot.
    pub fn active_projects(&self) -> Result<Vec<Project>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM projects
                 WHERE status IN ('processing', 'timing_out', 'credit_paused', 'zombie')
                 ORDER BY id ASC",
            )?;
            let rows = stmt
                .query_map([], project_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Row counts for `recovery diagnostics`.
    pub fn diagnostics_summary(&self) -> Result<DiagnosticsSummary, StoreError> {
        self.with_conn(|conn| {
            let count_by = |table: &str, column: &str| -> Result<Vec<StatusCount>, StoreError> {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {column}, COUNT(*) FROM {table} GROUP BY {column} ORDER BY {column}"
                ))?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok(StatusCount {
                            status: row.get(0)?,
                            count: row.get(1)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            };

            Ok(DiagnosticsSummary {
                projects: count_by("projects", "status")?,
                messages: count_by("messages", "status")?,
                agents: count_by("agents", "status")?,
                checkin_tasks: conn.query_row(
                    "SELECT COUNT(*) FROM checkin_tasks",
                    [],
                    |row| row.get(0),
                )?,
            })
        })
    }
}

fn find_active(
    conn: &Connection,
    spec_path: &str,
    project_path: Option<&str>,
) -> Result<Option<ProjectId>, StoreError> {
    let id = conn
        .query_row(
            "SELECT id FROM projects
             WHERE spec_path = ?1 AND ifnull(project_path, '') = ifnull(?2, '')
               AND status IN ('queued', 'processing')",
            params![spec_path, project_path],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

pub(crate) fn get_required(conn: &Connection, id: ProjectId) -> Result<Project, StoreError> {
    conn.query_row(
        "SELECT * FROM projects WHERE id = ?1",
        params![id],
        project_from_row,
    )
    .optional()?
    .ok_or_else(|| StoreError::NotFound(format!("project {id}")))
}

pub(crate) fn project_from_row(row: &Row) -> rusqlite::Result<Project> {
    let status_raw: String = row.get("status")?;
    let status = ProjectStatus::parse(&status_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            format!("unknown project status {status_raw:?}").into(),
        )
    })?;

    Ok(Project {
        id: row.get("id")?,
        spec_path: row.get("spec_path")?,
        project_path: row.get("project_path")?,
        batch_id: row.get("batch_id")?,
        priority: row.get("priority")?,
        enqueued_at: row.get("enqueued_at")?,
        status,
        retry_count: row.get("retry_count")?,
        session_name: row.get("session_name")?,
        main_pid: row.get("main_pid")?,
        started_at: row.get("started_at")?,
        heartbeat_at: row.get("heartbeat_at")?,
        timeout_extensions: row.get("timeout_extensions")?,
        error_message: row.get("error_message")?,
    })
}

#[cfg(test)]
#[path = "projects_tests.rs"]
mod tests;
