// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    communication = { "Communication", Some(RuleCategory::Communication) },
    git_lower = { "git", Some(RuleCategory::Git) },
    scheduling_padded = { "  Scheduling  ", Some(RuleCategory::Scheduling) },
    workflow_upper = { "WORKFLOW", Some(RuleCategory::Workflow) },
    unknown = { "Gardening", None },
)]
fn heading_parsing(heading: &str, expected: Option<RuleCategory>) {
    assert_eq!(RuleCategory::from_heading(heading), expected);
}

#[test]
fn category_prefixes_are_distinct() {
    let mut prefixes: Vec<&str> = RuleCategory::all().iter().map(|c| c.prefix()).collect();
    prefixes.sort_unstable();
    prefixes.dedup();
    assert_eq!(prefixes.len(), 6);
}

#[test]
fn severity_ordering() {
    assert!(Severity::Critical > Severity::High);
    assert!(Severity::High > Severity::Medium);
    assert!(Severity::Medium > Severity::Low);
}

#[test]
fn severity_parse() {
    assert_eq!(Severity::parse("critical"), Some(Severity::Critical));
    assert_eq!(Severity::parse(" High "), Some(Severity::High));
    assert_eq!(Severity::parse("severe"), None);
}

#[test]
fn violation_dedup_key_ignores_recipient_and_excerpt() {
    let base = Violation {
        detected_at: 100,
        sender: AgentId::new("s:1"),
        recipient: AgentId::new("s:2"),
        rule_ids: vec!["comm-001".to_string()],
        severity: Severity::High,
        excerpt: "direct message".to_string(),
        correction: "route via orchestrator".to_string(),
    };
    let mut other = base.clone();
    other.recipient = AgentId::new("s:3");
    other.excerpt = "another direct message".to_string();
    other.detected_at = 200;

    assert_eq!(base.dedup_key(), other.dedup_key());

    let mut different_rule = base.clone();
    different_rule.rule_ids = vec!["git-001".to_string()];
    assert_ne!(base.dedup_key(), different_rule.dedup_key());
}
