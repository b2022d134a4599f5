// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use gaffer_core::{RuleCategory, Severity};

const DOC: &str = "\
# Communication
- [high] All cross-agent traffic goes through the orchestrator (pattern: (?i)sent directly to) (fix: route via the hub)
- Keep messages short

# Git
- [critical] Never force-push shared branches (pattern: push\\s+--force)

# Notes
- This bullet is outside a known category and must be ignored
";

#[test]
fn extracts_ids_in_document_order() {
    let rules = extract_rules(DOC);
    assert_eq!(rules.len(), 3);

    assert_eq!(rules[0].id, "comm-001");
    assert_eq!(rules[0].category, RuleCategory::Communication);
    assert_eq!(rules[0].severity, Severity::High);
    assert_eq!(rules[0].pattern.as_deref(), Some("(?i)sent directly to"));
    assert_eq!(rules[0].correction.as_deref(), Some("route via the hub"));
    assert_eq!(
        rules[0].description,
        "All cross-agent traffic goes through the orchestrator"
    );

    assert_eq!(rules[1].id, "comm-002");
    assert_eq!(rules[1].severity, Severity::Medium);
    assert!(rules[1].pattern.is_none());

    assert_eq!(rules[2].id, "git-001");
    assert_eq!(rules[2].severity, Severity::Critical);
}

#[test]
fn wrapped_bullets_fold_into_one_rule() {
    let doc = "\
# Workflow
- [low] A long rule description that
  wraps onto the next line (fix: split your work)
";
    let rules = extract_rules(doc);
    assert_eq!(rules.len(), 1);
    assert_eq!(
        rules[0].description,
        "A long rule description that wraps onto the next line"
    );
    assert_eq!(rules[0].correction.as_deref(), Some("split your work"));
}

#[test]
fn nested_parens_in_patterns_survive() {
    let doc = "# Monitoring\n- check (pattern: (?i)(panic|fatal))\n";
    let rules = extract_rules(doc);
    assert_eq!(rules[0].pattern.as_deref(), Some("(?i)(panic|fatal)"));
}

#[test]
fn unknown_severity_annotation_is_part_of_the_text() {
    let doc = "# Git\n- [urgent] do the thing\n";
    let rules = extract_rules(doc);
    assert_eq!(rules[0].severity, Severity::Medium);
    assert!(rules[0].description.starts_with("[urgent]"));
}

#[test]
fn empty_document_yields_no_rules() {
    assert!(extract_rules("").is_empty());
    assert!(extract_rules("just prose\n\nno headings").is_empty());
}

#[test]
fn active_set_swaps_atomically() {
    let active = ActiveRuleSet::new();
    assert!(active.current().is_empty());

    let held = active.current();
    active.swap(extract_rules(DOC));

    // Old snapshot unchanged, new snapshot visible
    assert!(held.is_empty());
    assert_eq!(active.current().len(), 3);
}

#[test]
fn re_extraction_keeps_ids_stable() {
    let first = extract_rules(DOC);
    let second = extract_rules(DOC);
    assert_eq!(first, second);
}
