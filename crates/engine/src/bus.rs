// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent message bus over the store.
//!
//! Implements the pull-hook protocol, the per-agent delivery budget,
//! and rebriefing. Critical and emergency bands bypass the budget;
//! rate-limited messages stay `pending` and are retried on later pulls.

use crate::error::EngineError;
use crate::ratelimit::RateLimiter;
use gaffer_core::{
    AgentId, AgentStatus, Clock, ContextSnapshot, FifoScope, MessageId, REBRIEF_PRIORITY,
};
use gaffer_store::{EnqueueMessage, Store};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tracing::{info, warn};

/// Marker recorded in `last_error` when the agent layer reports credit
/// exhaustion; the scheduler backs off check-ins for these agents.
pub const CREDIT_EXHAUSTED_ERROR: &str = "credit_exhausted";

/// Priority floor that bypasses the delivery budget (critical band).
const BUDGET_BYPASS_FLOOR: u8 = 50;

/// Bus configuration.
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Per-agent delivery budget (messages per minute)
    pub rate_per_minute: u32,
    /// `pulled` messages older than this return to `pending`
    pub pull_timeout_secs: i64,
    /// Dependents are released after their prerequisite waits this long
    pub dependency_timeout_secs: i64,
    /// Rules document included in rebrief payloads
    pub rules_doc_path: PathBuf,
    /// `DISABLE_FAST_LANE` switch for the auto-coordination add-on
    pub fast_lane_enabled: bool,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            rate_per_minute: 10,
            pull_timeout_secs: 30,
            dependency_timeout_secs: 600,
            rules_doc_path: PathBuf::new(),
            fast_lane_enabled: true,
        }
    }
}

/// Why the agent-side hook is pulling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullMode {
    /// After tool use
    Normal,
    /// On session start: fetch the highest-priority waiting message
    Bootstrap,
    /// On context compaction: enqueue a rebrief to self, then pull
    Rebrief,
    /// On idle: pull, and flag the agent ready when empty
    CheckIdle,
}

/// Hook-facing record for one delivered message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Delivery {
    pub id: MessageId,
    pub payload: String,
    pub priority: u8,
    pub sequence_number: i64,
    pub is_rebrief: bool,
}

/// The agent message bus.
#[derive(Clone)]
pub struct MessageBus<C: Clock> {
    store: Store,
    clock: C,
    limiter: RateLimiter,
    config: BusConfig,
}

impl<C: Clock> MessageBus<C> {
    pub fn new(store: Store, clock: C, config: BusConfig) -> Self {
        Self {
            limiter: RateLimiter::new(config.rate_per_minute),
            store,
            clock,
            config,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Enqueue a message for an agent.
    pub fn send(
        &self,
        agent: &AgentId,
        payload: &[u8],
        priority: u8,
        dependency_id: Option<MessageId>,
        scope: FifoScope,
        project_name: Option<&str>,
    ) -> Result<MessageId, EngineError> {
        let id = self.store.enqueue_message(
            EnqueueMessage {
                agent,
                project_name,
                payload,
                priority,
                dependency_id,
                fifo_scope: scope,
            },
            self.clock.epoch_secs(),
        )?;
        Ok(id)
    }

    /// One pull per the hook protocol. Budget-limited pulls with only
    /// low-priority traffic waiting fail with `BudgetExceeded`; the
    /// messages stay `pending`.
    pub fn pull(
        &self,
        agent: &AgentId,
        mode: PullMode,
        project_name: Option<&str>,
    ) -> Result<Option<Delivery>, EngineError> {
        let now = self.clock.epoch_secs();

        if mode == PullMode::CheckIdle && self.store.get_agent(agent)?.is_none() {
            return Err(EngineError::AgentUnknown(agent.clone()));
        }

        if mode == PullMode::Rebrief {
            self.rebrief(agent)?;
        }

        let budget_open = self.limiter.try_acquire(agent.as_str(), self.clock.now());
        let floor = if budget_open {
            None
        } else {
            Some(BUDGET_BYPASS_FLOOR)
        };

        let outcome =
            self.store
                .pull_next_message(agent, project_name, floor, self.config.dependency_timeout_secs, now)?;

        match outcome.message {
            Some(message) => Ok(Some(Delivery {
                id: message.id,
                payload: message.payload_utf8(),
                priority: message.priority,
                sequence_number: message.sequence_number,
                is_rebrief: message.is_rebrief(),
            })),
            None => {
                if !budget_open && self.store.pending_count(agent)? > 0 {
                    return Err(EngineError::BudgetExceeded(agent.clone()));
                }
                if mode == PullMode::CheckIdle {
                    self.store.set_agent_status(agent, AgentStatus::Ready, now)?;
                }
                Ok(None)
            }
        }
    }

    /// Context-compaction recovery: compose the rules document and the
    /// agent's activity summary into a priority-200 self-message, and
    /// stamp the agent's `context_blob` with the snapshot hash.
    pub fn rebrief(&self, agent: &AgentId) -> Result<MessageId, EngineError> {
        let now = self.clock.epoch_secs();

        let rules = std::fs::read_to_string(&self.config.rules_doc_path).unwrap_or_default();
        let snapshot = self.store.load_snapshot(agent)?.unwrap_or(ContextSnapshot {
            agent_session: agent.clone(),
            last_briefing: None,
            briefing_content: rules.clone(),
            activity_summary: String::new(),
            checkpoint_data: None,
            updated_at: now,
        });

        let hash = snapshot_hash(&snapshot);
        let payload = serde_json::json!({
            "type": "rebrief",
            "rules": rules,
            "briefing": &snapshot.briefing_content,
            "activity_summary": &snapshot.activity_summary,
            "checkpoint": &snapshot.checkpoint_data,
            "snapshot_hash": &hash,
        });

        // Make sure the agent row exists before stamping it
        self.store.register_agent(agent, None, now)?;

        let id = self.store.enqueue_message(
            EnqueueMessage {
                agent,
                project_name: None,
                payload: payload.to_string().as_bytes(),
                priority: REBRIEF_PRIORITY,
                dependency_id: None,
                fifo_scope: FifoScope::Agent,
            },
            now,
        )?;

        let mut updated = snapshot;
        updated.last_briefing = Some(now);
        updated.updated_at = now;
        self.store.save_snapshot(&updated)?;
        self.store.update_context_blob(agent, &hash)?;

        info!(%agent, message_id = id, "rebrief enqueued");
        Ok(id)
    }

    /// Session end: explicitly ack the outstanding pull, then take the
    /// agent off the bus. A clean end removes the row; an unclean one
    /// marks it offline and expires its queue.
    pub fn session_end(&self, agent: &AgentId, clean: bool) -> Result<(), EngineError> {
        let now = self.clock.epoch_secs();
        self.store.ack_pulled(agent, now)?;

        if clean {
            self.store.delete_agent(agent)?;
        } else {
            match self.store.set_agent_status(agent, AgentStatus::Offline, now) {
                Ok(()) => {}
                Err(e) => warn!(%agent, error = %e, "offline mark failed"),
            }
            self.store.expire_pending(agent)?;
        }
        Ok(())
    }

    /// Error-notification hook: record the error; the lifecycle manager
    /// owns the restart decision.
    pub fn error_hook(&self, agent: &AgentId, error: &str) -> Result<(), EngineError> {
        let now = self.clock.epoch_secs();
        self.store.register_agent(agent, None, now)?;
        self.store.set_agent_error(agent, error, now)?;
        Ok(())
    }

    /// Mark an agent credit-exhausted (scheduler backs off check-ins).
    pub fn credit_exhausted(&self, agent: &AgentId) -> Result<(), EngineError> {
        self.error_hook(agent, CREDIT_EXHAUSTED_ERROR)
    }

    /// Periodic maintenance: requeue stale pulls.
    pub fn maintenance(&self) -> Result<usize, EngineError> {
        let requeued = self
            .store
            .requeue_stale_pulled(self.config.pull_timeout_secs, self.clock.epoch_secs())?;
        Ok(requeued)
    }
}

/// Hex SHA-256 of the snapshot's briefing + activity content.
pub fn snapshot_hash(snapshot: &ContextSnapshot) -> String {
    let mut hasher = Sha256::new();
    hasher.update(snapshot.briefing_content.as_bytes());
    hasher.update(b"\0");
    hasher.update(snapshot.activity_summary.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
