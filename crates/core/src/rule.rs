// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compliance rules and violation events.

use crate::agent::AgentId;
use serde::{Deserialize, Serialize};

/// Category of a monitorable rule. Maps to a heading in the rules
/// document and to the id prefix (`comm-001`, `git-002`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    Communication,
    Git,
    Scheduling,
    Integration,
    Workflow,
    Monitoring,
}

impl RuleCategory {
    /// Stable id prefix for rules in this category.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Communication => "comm",
            Self::Git => "git",
            Self::Scheduling => "sched",
            Self::Integration => "integ",
            Self::Workflow => "flow",
            Self::Monitoring => "mon",
        }
    }

    /// Match a rules-document heading (case-insensitive).
    pub fn from_heading(heading: &str) -> Option<Self> {
        match heading.trim().to_ascii_lowercase().as_str() {
            "communication" => Some(Self::Communication),
            "git" => Some(Self::Git),
            "scheduling" => Some(Self::Scheduling),
            "integration" => Some(Self::Integration),
            "workflow" => Some(Self::Workflow),
            "monitoring" => Some(Self::Monitoring),
            _ => None,
        }
    }

    pub fn all() -> [Self; 6] {
        [
            Self::Communication,
            Self::Git,
            Self::Scheduling,
            Self::Integration,
            Self::Workflow,
            Self::Monitoring,
        ]
    }
}

crate::simple_display! {
    RuleCategory {
        Communication => "communication",
        Git => "git",
        Scheduling => "scheduling",
        Integration => "integration",
        Workflow => "workflow",
        Monitoring => "monitoring",
    }
}

/// Severity of a rule or violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Parse a `[severity]` annotation body.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

crate::simple_display! {
    Severity {
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
}

/// One monitorable rule extracted from the rules document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Stable id within the category, e.g. `comm-001`
    pub id: String,
    pub category: RuleCategory,
    pub description: String,
    pub severity: Severity,
    /// Pattern hint for the deterministic evaluator (regex)
    pub pattern: Option<String>,
    /// Suggested correction included in violation events
    pub correction: Option<String>,
}

/// A detected rule violation in an agent-to-agent message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub detected_at: i64,
    pub sender: AgentId,
    pub recipient: AgentId,
    pub rule_ids: Vec<String>,
    pub severity: Severity,
    pub excerpt: String,
    pub correction: String,
}

impl Violation {
    /// Suppression key: identical violations within the sliding window
    /// produce a single event.
    pub fn dedup_key(&self) -> String {
        format!("{}|{}", self.sender, self.rule_ids.join(","))
    }
}

#[cfg(test)]
#[path = "rule_tests.rs"]
mod tests;
