// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent identity, live-state record, and context snapshot.
//!
//! An agent is one AI assistant in one window of a terminal-multiplexer
//! session; its identity is the `session:window` target string.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from parsing an agent target.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AgentIdError {
    #[error("agent target must be session:window, got {0:?}")]
    MissingWindow(String),
    #[error("agent target has an empty session part: {0:?}")]
    EmptySession(String),
}

crate::define_id! {
    /// Agent identity in `session:window` form (the multiplexer target).
    pub struct AgentId;
}

impl AgentId {
    /// Build from separate session and window parts.
    pub fn from_parts(session: &str, window: &str) -> Self {
        Self(format!("{session}:{window}"))
    }

    /// Validate the `session:window` shape.
    pub fn parse(target: &str) -> Result<Self, AgentIdError> {
        let (session, window) = target
            .split_once(':')
            .ok_or_else(|| AgentIdError::MissingWindow(target.to_string()))?;
        if session.is_empty() {
            return Err(AgentIdError::EmptySession(target.to_string()));
        }
        if window.is_empty() {
            return Err(AgentIdError::MissingWindow(target.to_string()));
        }
        Ok(Self(target.to_string()))
    }

    /// Session part of the target.
    pub fn session(&self) -> &str {
        self.0.split_once(':').map(|(s, _)| s).unwrap_or(&self.0)
    }

    /// Window part of the target (name or index).
    pub fn window(&self) -> &str {
        self.0.split_once(':').map(|(_, w)| w).unwrap_or("")
    }
}

/// Live status of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Working on something
    Active,
    /// Idle with an empty queue
    Ready,
    /// Session ended
    Offline,
    /// Error hook fired
    Error,
}

impl AgentStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "ready" => Some(Self::Ready),
            "offline" => Some(Self::Offline),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

crate::simple_display! {
    AgentStatus {
        Active => "active",
        Ready => "ready",
        Offline => "offline",
        Error => "error",
    }
}

/// Durable per-agent state, created on first pull contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub agent_session: AgentId,
    pub project_name: Option<String>,
    pub status: AgentStatus,
    pub ready_since: Option<i64>,
    pub last_heartbeat: Option<i64>,
    pub last_sequence_delivered: Option<i64>,
    pub restart_count: u32,
    pub last_restart: Option<i64>,
    pub last_error: Option<String>,
    /// Opaque context payload maintained by the agent layer
    pub context_blob: Option<String>,
}

impl AgentRecord {
    /// Fresh record for an agent seen for the first time.
    pub fn first_contact(agent: AgentId, project: Option<String>, now: i64) -> Self {
        Self {
            agent_session: agent,
            project_name: project,
            status: AgentStatus::Active,
            ready_since: None,
            last_heartbeat: Some(now),
            last_sequence_delivered: None,
            restart_count: 0,
            last_restart: None,
            last_error: None,
            context_blob: None,
        }
    }
}

/// Snapshot used to rebrief an agent after context-window compaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub agent_session: AgentId,
    pub last_briefing: Option<i64>,
    pub briefing_content: String,
    pub activity_summary: String,
    pub checkpoint_data: Option<String>,
    pub updated_at: i64,
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
