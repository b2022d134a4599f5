// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::analyzer::RuleMatch;
use gaffer_core::test_support::agent;

fn report(rule_ids: &[&str]) -> ComplianceReport {
    ComplianceReport {
        compliant: rule_ids.is_empty(),
        violations: rule_ids
            .iter()
            .map(|id| RuleMatch {
                rule_id: id.to_string(),
                severity: if id.starts_with("git") {
                    Severity::Critical
                } else {
                    Severity::Medium
                },
                excerpt: "bad line".to_string(),
                correction: "do better".to_string(),
            })
            .collect(),
    }
}

#[test]
fn compliant_reports_emit_nothing() {
    let emitter = ViolationEmitter::default();
    assert!(emitter
        .emit(&report(&[]), &agent(1), &agent(2), 100)
        .is_none());
}

#[test]
fn violation_carries_max_severity_and_all_rules() {
    let emitter = ViolationEmitter::default();
    let violation = emitter
        .emit(&report(&["comm-001", "git-001"]), &agent(1), &agent(2), 100)
        .unwrap();

    assert_eq!(violation.severity, Severity::Critical);
    assert_eq!(violation.rule_ids, vec!["comm-001", "git-001"]);
    assert_eq!(violation.sender, agent(1));
    assert_eq!(violation.recipient, agent(2));
}

#[test]
fn duplicates_are_suppressed_within_the_window() {
    let emitter = ViolationEmitter::new(300);
    assert!(emitter
        .emit(&report(&["comm-001"]), &agent(1), &agent(2), 100)
        .is_some());
    // Same sender + rule inside the window: suppressed
    assert!(emitter
        .emit(&report(&["comm-001"]), &agent(1), &agent(3), 200)
        .is_none());
    // Window elapsed: emitted again
    assert!(emitter
        .emit(&report(&["comm-001"]), &agent(1), &agent(2), 401)
        .is_some());
}

#[test]
fn different_senders_are_not_suppressed() {
    let emitter = ViolationEmitter::new(300);
    assert!(emitter
        .emit(&report(&["comm-001"]), &agent(1), &agent(2), 100)
        .is_some());
    assert!(emitter
        .emit(&report(&["comm-001"]), &agent(2), &agent(1), 100)
        .is_some());
}
