// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recurring check-in task row for the scheduler daemon.

use crate::agent::AgentId;
use serde::{Deserialize, Serialize};

/// Cause string that the anti-self-scheduling guard drops for
/// orchestrator-role agents at fire time.
pub const COMPLETION_REPORT_CAUSE: &str = "completion report";

/// A durable recurring task that sends a message to one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckinTask {
    pub id: i64,
    pub agent: AgentId,
    pub next_run_at: i64,
    pub interval_secs: i64,
    pub note: String,
    pub last_run_at: Option<i64>,
    /// Why this task exists, e.g. "completion report"
    pub cause: String,
}

impl CheckinTask {
    pub fn is_due(&self, now: i64) -> bool {
        self.next_run_at <= now
    }

    /// A fire was missed when the last run is older than twice the
    /// interval. Missed tasks catch up exactly once.
    pub fn missed_fire(&self, now: i64) -> bool {
        match self.last_run_at {
            Some(last) => now.saturating_sub(last) > 2 * self.interval_secs,
            None => false,
        }
    }

    pub fn is_completion_report(&self) -> bool {
        self.cause == COMPLETION_REPORT_CAUSE
    }
}

#[cfg(test)]
#[path = "checkin_tests.rs"]
mod tests;
