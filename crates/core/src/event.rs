// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process bus events and their log-record shape.
//!
//! Serializes with `{"type": "channel:name", ...fields}` format.

use crate::agent::AgentId;
use crate::project::ProjectId;
use crate::rule::{Severity, Violation};
use serde::{Deserialize, Serialize};

/// Severity attached to an event-log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSeverity {
    Info,
    Warning,
    Critical,
    /// Bypasses the notifier rate limit
    Emergency,
}

crate::simple_display! {
    EventSeverity {
        Info => "info",
        Warning => "warning",
        Critical => "critical",
        Emergency => "emergency",
    }
}

/// Events published on the in-process bus and appended to the daily
/// event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BusEvent {
    #[serde(rename = "violation")]
    Violation { violation: Violation },

    #[serde(rename = "project:completed")]
    ProjectCompleted {
        project_id: ProjectId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_name: Option<String>,
    },

    #[serde(rename = "project:failed")]
    ProjectFailed {
        project_id: ProjectId,
        reason: String,
    },

    #[serde(rename = "status:update")]
    StatusUpdate {
        project_id: ProjectId,
        status: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },

    #[serde(rename = "credit:exhausted")]
    CreditExhausted { agent: AgentId },

    #[serde(rename = "task:completed")]
    TaskCompleted { task_id: i64, agent: AgentId },
}

impl BusEvent {
    /// Notifier channel this event belongs to.
    pub fn channel(&self) -> &'static str {
        match self {
            BusEvent::Violation { .. } => "violation",
            BusEvent::ProjectCompleted { .. } => "project_completed",
            BusEvent::ProjectFailed { .. } => "project_failed",
            BusEvent::StatusUpdate { .. } => "status_update",
            BusEvent::CreditExhausted { .. } => "credit_exhausted",
            BusEvent::TaskCompleted { .. } => "task_completed",
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            BusEvent::Violation { violation } => match violation.severity {
                Severity::Critical => EventSeverity::Emergency,
                Severity::High => EventSeverity::Critical,
                _ => EventSeverity::Warning,
            },
            BusEvent::ProjectFailed { .. } => EventSeverity::Warning,
            BusEvent::CreditExhausted { .. } => EventSeverity::Critical,
            BusEvent::ProjectCompleted { .. }
            | BusEvent::StatusUpdate { .. }
            | BusEvent::TaskCompleted { .. } => EventSeverity::Info,
        }
    }

    /// One-line summary for log spans.
    pub fn log_summary(&self) -> String {
        match self {
            BusEvent::Violation { violation } => format!(
                "violation sender={} rules={}",
                violation.sender,
                violation.rule_ids.join(",")
            ),
            BusEvent::ProjectCompleted { project_id, .. } => {
                format!("project {} completed", project_id)
            }
            BusEvent::ProjectFailed { project_id, reason } => {
                format!("project {} failed: {}", project_id, reason)
            }
            BusEvent::StatusUpdate {
                project_id, status, ..
            } => format!("project {} -> {}", project_id, status),
            BusEvent::CreditExhausted { agent } => format!("credit exhausted for {}", agent),
            BusEvent::TaskCompleted { task_id, agent } => {
                format!("task {} completed for {}", task_id, agent)
            }
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
