// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message queue operations: atomic sequence assignment, dependency
//! gating, FIFO pull with implicit ack, and stale-pull maintenance.

use crate::error::StoreError;
use crate::store::Store;
use gaffer_core::{AgentId, AgentRecord, FifoScope, Message, MessageId, MessageStatus};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashSet;
use tracing::warn;

/// Default dependency timeout: a dependent is released after its
/// prerequisite has sat undelivered this long.
pub const DEFAULT_DEPENDENCY_TIMEOUT_SECS: i64 = 600;

/// Dependency chains longer than this are treated as cycles.
const MAX_DEPENDENCY_DEPTH: usize = 64;

/// Parameters for [`Store::enqueue_message`].
#[derive(Debug, Clone)]
pub struct EnqueueMessage<'a> {
    pub agent: &'a AgentId,
    pub project_name: Option<&'a str>,
    pub payload: &'a [u8],
    pub priority: u8,
    pub dependency_id: Option<MessageId>,
    pub fifo_scope: FifoScope,
}

/// Result of a pull: the message (if any) plus the id of the previous
/// in-flight message that was implicitly acked by this pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullOutcome {
    pub message: Option<Message>,
    pub acked: Option<MessageId>,
}

impl Store {
    /// Enqueue a message, assigning its sequence number atomically from
    /// the single-row generator. Rejects dependency cycles.
    pub fn enqueue_message(
        &self,
        req: EnqueueMessage<'_>,
        now: i64,
    ) -> Result<MessageId, StoreError> {
        self.with_tx(|tx| {
            if let Some(dep) = req.dependency_id {
                check_dependency_chain(tx, dep)?;
            }

            tx.execute("UPDATE sequence_generator SET value = value + 1 WHERE id = 1", [])?;
            let seq: i64 =
                tx.query_row("SELECT value FROM sequence_generator WHERE id = 1", [], |row| {
                    row.get(0)
                })?;

            tx.execute(
                "INSERT INTO messages
                     (agent_session, project_name, message, priority, sequence_number,
                      dependency_id, status, enqueued_at, fifo_scope)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7, ?8)",
                params![
                    req.agent.as_str(),
                    req.project_name,
                    req.payload,
                    req.priority as i64,
                    seq,
                    req.dependency_id,
                    now,
                    req.fifo_scope.to_string()
                ],
            )?;
            Ok(tx.last_insert_rowid())
        })
    }

    /// Pull the next eligible message for an agent.
    ///
    /// Eligibility: `pending`, at or above `min_priority` when one is
    /// given (the rate-limit bypass floor), and either no dependency,
    /// or the dependency is `delivered`, or the dependency has been
    /// waiting longer than `dependency_timeout_secs` (released with a
    /// warning). Delivery order is priority descending, then sequence
    /// ascending.
    ///
    /// The agent's previous `pulled` message is marked `delivered`
    /// (implicit ack) and the returned message becomes `pulled`. The
    /// agent row is created on first contact.
    pub fn pull_next_message(
        &self,
        agent: &AgentId,
        project_name: Option<&str>,
        min_priority: Option<u8>,
        dependency_timeout_secs: i64,
        now: i64,
    ) -> Result<PullOutcome, StoreError> {
        self.with_tx(|tx| {
            let stale_cutoff = now - dependency_timeout_secs;

            let candidate = tx
                .query_row(
                    "SELECT m.* FROM messages m WHERE m.agent_session = ?1
                       AND m.status = 'pending'
                       AND m.priority >= ifnull(?3, 0)
                       AND (m.dependency_id IS NULL OR NOT EXISTS (
                           SELECT 1 FROM messages d
                           WHERE d.id = m.dependency_id
                             AND d.status <> 'delivered'
                             AND d.enqueued_at > ?2))
                     ORDER BY m.priority DESC, m.sequence_number ASC
                     LIMIT 1",
                    params![agent.as_str(), stale_cutoff, min_priority.map(|p| p as i64)],
                    message_from_row,
                )
                .optional()?;

            // Implicit ack of the previous in-flight message
            let acked: Option<MessageId> = tx
                .query_row(
                    "SELECT id FROM messages
                     WHERE agent_session = ?1 AND status = 'pulled'
                     ORDER BY pulled_at ASC LIMIT 1",
                    params![agent.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(acked_id) = acked {
                tx.execute(
                    "UPDATE messages SET status = 'delivered', delivered_at = ?2
                     WHERE id = ?1",
                    params![acked_id, now],
                )?;
                tx.execute(
                    "UPDATE agents SET last_sequence_delivered =
                         (SELECT sequence_number FROM messages WHERE id = ?2)
                     WHERE agent_session = ?1",
                    params![agent.as_str(), acked_id],
                )?;
            }

            let message = match candidate {
                Some(msg) => {
                    if msg.dependency_id.is_some() {
                        let gate_open: bool = tx.query_row(
                            "SELECT NOT EXISTS (
                                 SELECT 1 FROM messages d
                                 WHERE d.id = ?1 AND d.status <> 'delivered')",
                            params![msg.dependency_id],
                            |row| row.get(0),
                        )?;
                        if !gate_open {
                            warn!(
                                message_id = msg.id,
                                dependency_id = msg.dependency_id,
                                "dependency timeout expired, releasing dependent"
                            );
                        }
                    }
                    tx.execute(
                        "UPDATE messages SET status = 'pulled', pulled_at = ?2 WHERE id = ?1",
                        params![msg.id, now],
                    )?;
                    tx.query_row(
                        "SELECT * FROM messages WHERE id = ?1",
                        params![msg.id],
                        message_from_row,
                    )
                    .optional()?
                }
                None => None,
            };

            upsert_agent_contact(tx, agent, project_name, now)?;

            Ok(PullOutcome { message, acked })
        })
    }

    /// Return `pulled` messages older than the pull timeout to
    /// `pending`. Periodic maintenance; returns the requeued count.
    pub fn requeue_stale_pulled(&self, timeout_secs: i64, now: i64) -> Result<usize, StoreError> {
        self.with_tx(|tx| {
            let cutoff = now - timeout_secs;
            let changed = tx.execute(
                "UPDATE messages SET status = 'pending', pulled_at = NULL
                 WHERE status = 'pulled' AND pulled_at < ?1",
                params![cutoff],
            )?;
            if changed > 0 {
                warn!(count = changed, "requeued stale pulled messages");
            }
            Ok(changed)
        })
    }

    /// Explicitly ack the agent's outstanding pulled message (session
    /// end). Returns the acked id, if any.
    pub fn ack_pulled(&self, agent: &AgentId, now: i64) -> Result<Option<MessageId>, StoreError> {
        self.with_tx(|tx| {
            let acked: Option<MessageId> = tx
                .query_row(
                    "SELECT id FROM messages
                     WHERE agent_session = ?1 AND status = 'pulled'
                     ORDER BY pulled_at ASC LIMIT 1",
                    params![agent.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(id) = acked {
                tx.execute(
                    "UPDATE messages SET status = 'delivered', delivered_at = ?2 WHERE id = ?1",
                    params![id, now],
                )?;
            }
            Ok(acked)
        })
    }

    /// Expire an offline agent's undelivered messages (session reaped).
    pub fn expire_pending(&self, agent: &AgentId) -> Result<usize, StoreError> {
        self.with_tx(|tx| {
            let changed = tx.execute(
                "UPDATE messages SET status = 'expired'
                 WHERE agent_session = ?1 AND status IN ('pending', 'pulled')",
                params![agent.as_str()],
            )?;
            Ok(changed)
        })
    }

    pub fn get_message(&self, id: MessageId) -> Result<Message, StoreError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT * FROM messages WHERE id = ?1",
                params![id],
                message_from_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("message {id}")))
        })
    }

    /// Messages recorded after a cursor, oldest first. The compliance
    /// scanner tails the queue with this.
    pub fn messages_after(
        &self,
        cursor: MessageId,
        limit: usize,
    ) -> Result<Vec<Message>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT * FROM messages WHERE id > ?1 ORDER BY id ASC LIMIT ?2")?;
            let rows = stmt
                .query_map(params![cursor, limit as i64], message_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Highest message id, or 0 when empty (scan cursor bootstrap).
    pub fn max_message_id(&self) -> Result<MessageId, StoreError> {
        self.with_conn(|conn| {
            let id = conn.query_row("SELECT ifnull(max(id), 0) FROM messages", [], |row| {
                row.get(0)
            })?;
            Ok(id)
        })
    }

    /// Count of undelivered messages waiting for an agent.
    pub fn pending_count(&self, agent: &AgentId) -> Result<i64, StoreError> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM messages
                 WHERE agent_session = ?1 AND status = 'pending'",
                params![agent.as_str()],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }
}

/// Walk the dependency chain from `dep`, rejecting cycles and
/// over-deep chains. Bounded DFS; edges point at existing rows only, so
/// depth is the limiting factor.
fn check_dependency_chain(conn: &Connection, dep: MessageId) -> Result<(), StoreError> {
    let mut seen = HashSet::new();
    let mut current = Some(dep);

    while let Some(id) = current {
        if !seen.insert(id) || seen.len() > MAX_DEPENDENCY_DEPTH {
            return Err(StoreError::DependencyCycle(id));
        }
        current = conn
            .query_row(
                "SELECT dependency_id FROM messages WHERE id = ?1",
                params![id],
                |row| row.get::<_, Option<MessageId>>(0),
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("dependency message {id}")))?;
    }
    Ok(())
}

/// Create the agent row on first contact; freshen the heartbeat after.
pub(crate) fn upsert_agent_contact(
    conn: &Connection,
    agent: &AgentId,
    project_name: Option<&str>,
    now: i64,
) -> Result<(), StoreError> {
    let record = AgentRecord::first_contact(agent.clone(), project_name.map(String::from), now);
    conn.execute(
        "INSERT INTO agents (agent_session, project_name, status, last_heartbeat)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(agent_session) DO UPDATE SET
             last_heartbeat = excluded.last_heartbeat,
             project_name = coalesce(excluded.project_name, agents.project_name)",
        params![
            record.agent_session.as_str(),
            record.project_name,
            record.status.to_string(),
            now
        ],
    )?;
    Ok(())
}

pub(crate) fn message_from_row(row: &Row) -> rusqlite::Result<Message> {
    let status_raw: String = row.get("status")?;
    let status = MessageStatus::parse(&status_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            format!("unknown message status {status_raw:?}").into(),
        )
    })?;
    let scope_raw: String = row.get("fifo_scope")?;
    let fifo_scope = FifoScope::parse(&scope_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            format!("unknown fifo scope {scope_raw:?}").into(),
        )
    })?;

    let agent_session: String = row.get("agent_session")?;
    let priority: i64 = row.get("priority")?;

    Ok(Message {
        id: row.get("id")?,
        agent_session: AgentId::new(agent_session),
        project_name: row.get("project_name")?,
        payload: row.get("message")?,
        priority: priority.clamp(0, 255) as u8,
        sequence_number: row.get("sequence_number")?,
        dependency_id: row.get("dependency_id")?,
        status,
        enqueued_at: row.get("enqueued_at")?,
        pulled_at: row.get("pulled_at")?,
        delivered_at: row.get("delivered_at")?,
        fifo_scope,
    })
}

#[cfg(test)]
#[path = "messages_tests.rs"]
mod tests;
