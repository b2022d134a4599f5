// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Violation emitter with sliding-window duplicate suppression.

use crate::analyzer::ComplianceReport;
use gaffer_core::{AgentId, Severity, Violation};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Default suppression window: identical violations within it produce
/// one event.
pub const DEFAULT_SUPPRESSION_SECS: i64 = 300;

/// Turns non-compliant reports into [`Violation`]s, suppressing
/// duplicates (same sender + rule set) within the sliding window.
#[derive(Clone)]
pub struct ViolationEmitter {
    window_secs: i64,
    last_emitted: Arc<Mutex<HashMap<String, i64>>>,
}

impl Default for ViolationEmitter {
    fn default() -> Self {
        Self::new(DEFAULT_SUPPRESSION_SECS)
    }
}

impl ViolationEmitter {
    pub fn new(window_secs: i64) -> Self {
        Self {
            window_secs,
            last_emitted: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Build the violation for a non-compliant report, or `None` when
    /// the report is compliant or a duplicate inside the window.
    pub fn emit(
        &self,
        report: &ComplianceReport,
        sender: &AgentId,
        recipient: &AgentId,
        now: i64,
    ) -> Option<Violation> {
        if report.compliant || report.violations.is_empty() {
            return None;
        }

        let severity = report
            .violations
            .iter()
            .map(|v| v.severity)
            .max()
            .unwrap_or(Severity::Medium);

        let violation = Violation {
            detected_at: now,
            sender: sender.clone(),
            recipient: recipient.clone(),
            rule_ids: report.violations.iter().map(|v| v.rule_id.clone()).collect(),
            severity,
            excerpt: report.violations[0].excerpt.clone(),
            correction: report.violations[0].correction.clone(),
        };

        let key = violation.dedup_key();
        let mut last_emitted = self.last_emitted.lock();
        if let Some(last) = last_emitted.get(&key) {
            if now - last < self.window_secs {
                debug!(key, "suppressing duplicate violation");
                return None;
            }
        }
        last_emitted.insert(key, now);

        // Keep the window map from growing without bound
        last_emitted.retain(|_, t| now - *t < self.window_secs);

        Some(violation)
    }
}

#[cfg(test)]
#[path = "emitter_tests.rs"]
mod tests;
