// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rules-document extractor.
//!
//! Document format: `#`-prefixed category headings (Communication, Git,
//! Scheduling, Integration, Workflow, Monitoring; case-insensitive),
//! followed by `-`/`*` bullets. A bullet may lead with a `[severity]`
//! annotation and may carry `(pattern: <regex>)` and `(fix: <text>)`
//! trailers:
//!
//! ```text
//! # Communication
//! - [high] All cross-agent traffic goes through the orchestrator
//!   (pattern: (?i)bypass.*orchestrator) (fix: route via the hub)
//! ```

use gaffer_core::{Rule, RuleCategory, Severity};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Parse a rules document into rules with stable per-category ids
/// (`comm-001`, `git-002`, ... in document order).
pub fn extract_rules(document: &str) -> Vec<Rule> {
    let mut rules = Vec::new();
    let mut counters: HashMap<RuleCategory, u32> = HashMap::new();
    let mut category: Option<RuleCategory> = None;
    // Bullets may wrap; fold continuation lines into the open bullet.
    let mut open_bullet: Option<String> = None;

    for line in document.lines() {
        let trimmed = line.trim();

        if let Some(heading) = trimmed.strip_prefix('#') {
            flush_bullet(&mut open_bullet, category, &mut counters, &mut rules);
            category = RuleCategory::from_heading(heading.trim_start_matches('#'));
            continue;
        }

        let bullet_body = trimmed
            .strip_prefix("- ")
            .or_else(|| trimmed.strip_prefix("* "));

        match bullet_body {
            Some(body) => {
                flush_bullet(&mut open_bullet, category, &mut counters, &mut rules);
                open_bullet = Some(body.to_string());
            }
            None if trimmed.is_empty() => {
                flush_bullet(&mut open_bullet, category, &mut counters, &mut rules);
            }
            None => {
                if let Some(bullet) = open_bullet.as_mut() {
                    bullet.push(' ');
                    bullet.push_str(trimmed);
                }
            }
        }
    }
    flush_bullet(&mut open_bullet, category, &mut counters, &mut rules);

    rules
}

fn flush_bullet(
    open_bullet: &mut Option<String>,
    category: Option<RuleCategory>,
    counters: &mut HashMap<RuleCategory, u32>,
    rules: &mut Vec<Rule>,
) {
    let Some(body) = open_bullet.take() else {
        return;
    };
    // Bullets outside a recognised heading are ignored
    let Some(category) = category else {
        return;
    };

    let seq = counters.entry(category).or_insert(0);
    *seq += 1;

    rules.push(parse_bullet(&body, category, *seq));
}

fn parse_bullet(body: &str, category: RuleCategory, seq: u32) -> Rule {
    let mut rest = body.trim();
    let mut severity = Severity::Medium;

    if let Some(after) = rest.strip_prefix('[') {
        if let Some((annotation, tail)) = after.split_once(']') {
            if let Some(parsed) = Severity::parse(annotation) {
                severity = parsed;
                rest = tail.trim_start();
            }
        }
    }

    let (rest, pattern) = take_trailer(rest, "pattern:");
    let (rest, correction) = take_trailer(&rest, "fix:");

    Rule {
        id: format!("{}-{:03}", category.prefix(), seq),
        category,
        description: rest.trim().to_string(),
        severity,
        pattern,
        correction,
    }
}

/// Split a `(<key> <value>)` trailer out of a bullet body. The value
/// runs to the matching close paren; patterns may contain nested parens.
fn take_trailer(body: &str, key: &str) -> (String, Option<String>) {
    let open = format!("({key}");
    let Some(start) = body.find(&open) else {
        return (body.to_string(), None);
    };

    let value_start = start + open.len();
    let mut depth = 1usize;
    let mut end = None;
    for (i, c) in body[value_start..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    end = Some(value_start + i);
                    break;
                }
            }
            _ => {}
        }
    }

    let Some(end) = end else {
        return (body.to_string(), None);
    };

    let value = body[value_start..end].trim().to_string();
    let mut remainder = String::new();
    remainder.push_str(&body[..start]);
    remainder.push_str(&body[end + 1..]);

    let value = if value.is_empty() { None } else { Some(value) };
    (remainder, value)
}

/// The process-wide active rule set, swapped atomically on reload.
///
/// Derived state: the rules document is authoritative, and any reader
/// holding a previous `Arc` simply finishes with the old set.
#[derive(Clone, Default)]
pub struct ActiveRuleSet {
    inner: Arc<RwLock<Arc<Vec<Rule>>>>,
}

impl ActiveRuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the active set.
    pub fn swap(&self, rules: Vec<Rule>) {
        *self.inner.write() = Arc::new(rules);
    }

    /// Snapshot of the active set.
    pub fn current(&self) -> Arc<Vec<Rule>> {
        Arc::clone(&self.inner.read())
    }
}

#[cfg(test)]
#[path = "rules_tests.rs"]
mod tests;
