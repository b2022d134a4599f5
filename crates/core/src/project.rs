// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project queue row and its state machine.

use serde::{Deserialize, Serialize};

/// Row identifier in the project queue.
pub type ProjectId = i64;

/// Status of a queued project.
///
/// Transitions are validated by [`ProjectStatus::can_transition_to`]:
///
/// ```text
/// queued ──► processing ──► completed
///               │  │  │
///               │  │  ├──► timing_out ──► failed | completed
///               │  ├─────► zombie ──────► failed
///               │  └─────► credit_paused ──► processing | failed
///               └──► failed (fatal error, from any non-terminal state)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    /// Waiting for admission
    Queued,
    /// Admitted; setup subprocess and agent session running
    Processing,
    /// Deadline reached; graceful stop signalled, grace window running
    TimingOut,
    /// Supervised process alive but its terminal session is gone
    Zombie,
    /// Terminal: completion detected
    Completed,
    /// Terminal: failed or reaped
    Failed,
    /// Agent layer reported credit exhaustion; timers suspended
    CreditPaused,
}

impl ProjectStatus {
    /// Whether this status is terminal (no further mutation except audit).
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProjectStatus::Completed | ProjectStatus::Failed)
    }

    /// Whether a row in this status occupies the single admission slot.
    ///
    /// `credit_paused` holds the slot: a paused project must not find its
    /// slot stolen when credit returns.
    pub fn holds_admission_slot(&self) -> bool {
        matches!(
            self,
            ProjectStatus::Processing | ProjectStatus::TimingOut | ProjectStatus::CreditPaused
        )
    }

    /// Whether the idempotent-enqueue uniqueness window covers this status.
    pub fn in_enqueue_window(&self) -> bool {
        matches!(self, ProjectStatus::Queued | ProjectStatus::Processing)
    }

    /// Validate a transition per the state machine.
    pub fn can_transition_to(&self, to: ProjectStatus) -> bool {
        use ProjectStatus::*;
        match (self, to) {
            (Queued, Processing) => true,
            (Processing, TimingOut | Zombie | CreditPaused | Completed) => true,
            (TimingOut, Completed) => true,
            (CreditPaused, Processing) => true,
            // Fatal errors can fail anything that isn't already terminal.
            (from, Failed) if !from.is_terminal() => true,
            _ => false,
        }
    }

    /// Parse from the snake_case storage representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(Self::Queued),
            "processing" => Some(Self::Processing),
            "timing_out" => Some(Self::TimingOut),
            "zombie" => Some(Self::Zombie),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "credit_paused" => Some(Self::CreditPaused),
            _ => None,
        }
    }
}

crate::simple_display! {
    ProjectStatus {
        Queued => "queued",
        Processing => "processing",
        TimingOut => "timing_out",
        Zombie => "zombie",
        Completed => "completed",
        Failed => "failed",
        CreditPaused => "credit_paused",
    }
}

/// One unit of orchestration: a spec file plus an optional target directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub spec_path: String,
    pub project_path: Option<String>,
    pub batch_id: Option<String>,
    /// Higher first; ties broken by oldest `enqueued_at`.
    pub priority: i64,
    /// Epoch seconds
    pub enqueued_at: i64,
    pub status: ProjectStatus,
    pub retry_count: u32,
    /// Terminal-multiplexer session supervising this project
    pub session_name: Option<String>,
    /// PID of the setup subprocess
    pub main_pid: Option<i32>,
    pub started_at: Option<i64>,
    pub heartbeat_at: Option<i64>,
    pub timeout_extensions: u32,
    pub error_message: Option<String>,
}

impl Project {
    /// Seconds since the last heartbeat, or since start if none recorded.
    pub fn heartbeat_age(&self, now: i64) -> Option<i64> {
        self.heartbeat_at
            .or(self.started_at)
            .map(|t| now.saturating_sub(t))
    }

    /// Seconds this project has been running, if started.
    pub fn runtime(&self, now: i64) -> Option<i64> {
        self.started_at.map(|t| now.saturating_sub(t))
    }
}

crate::builder! {
    pub struct ProjectBuilder => Project {
        into {
            spec_path: String = "/specs/test.md",
        }
        set {
            id: ProjectId = 1,
            priority: i64 = 0,
            enqueued_at: i64 = 0,
            status: ProjectStatus = ProjectStatus::Queued,
            retry_count: u32 = 0,
            timeout_extensions: u32 = 0,
        }
        option {
            project_path: String = None,
            batch_id: String = None,
            session_name: String = None,
            main_pid: i32 = None,
            started_at: i64 = None,
            heartbeat_at: i64 = None,
            error_message: String = None,
        }
    }
}

#[cfg(test)]
#[path = "project_tests.rs"]
mod tests;
