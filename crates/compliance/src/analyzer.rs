// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message analyser.
//!
//! Evaluates each agent-to-agent message against the active rule set.
//! The [`Evaluator`] seam admits an external AI evaluator; the
//! deterministic [`PatternEvaluator`] is the fallback and evaluates the
//! per-rule regex hints (rules without patterns never match there).

use crate::rules::ActiveRuleSet;
use crate::ComplianceError;
use async_trait::async_trait;
use gaffer_core::{Rule, Severity};
use parking_lot::Mutex;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;

/// Excerpt length included in violation records.
const EXCERPT_LEN: usize = 120;

/// One matched rule within a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    pub rule_id: String,
    pub severity: Severity,
    pub excerpt: String,
    pub correction: String,
}

/// Structured result of analysing one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplianceReport {
    pub compliant: bool,
    pub violations: Vec<RuleMatch>,
}

/// Evaluation seam: an external AI evaluator when available, the
/// pattern fallback otherwise.
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(
        &self,
        message: &str,
        rules: &[Rule],
    ) -> Result<Vec<RuleMatch>, ComplianceError>;
}

/// Deterministic fallback: regex per rule, compiled once and cached.
#[derive(Clone, Default)]
pub struct PatternEvaluator {
    cache: Arc<Mutex<HashMap<String, Regex>>>,
}

impl PatternEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    fn compiled(&self, pattern: &str) -> Result<Regex, ComplianceError> {
        if let Some(regex) = self.cache.lock().get(pattern) {
            return Ok(regex.clone());
        }
        let regex = Regex::new(pattern).map_err(|source| ComplianceError::BadPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        self.cache
            .lock()
            .insert(pattern.to_string(), regex.clone());
        Ok(regex)
    }
}

#[async_trait]
impl Evaluator for PatternEvaluator {
    async fn evaluate(
        &self,
        message: &str,
        rules: &[Rule],
    ) -> Result<Vec<RuleMatch>, ComplianceError> {
        let mut matches = Vec::new();

        for rule in rules {
            let Some(pattern) = &rule.pattern else {
                continue;
            };
            let regex = match self.compiled(pattern) {
                Ok(regex) => regex,
                Err(e) => {
                    // One bad pattern must not blind the whole pass
                    tracing::warn!(rule_id = %rule.id, error = %e, "skipping unusable rule pattern");
                    continue;
                }
            };

            if let Some(found) = regex.find(message) {
                matches.push(RuleMatch {
                    rule_id: rule.id.clone(),
                    severity: rule.severity,
                    excerpt: excerpt_around(message, found.start()),
                    correction: rule
                        .correction
                        .clone()
                        .unwrap_or_else(|| rule.description.clone()),
                });
            }
        }

        Ok(matches)
    }
}

/// Analyser over the active rule set.
#[derive(Clone)]
pub struct Analyzer<E> {
    rules: ActiveRuleSet,
    evaluator: E,
}

impl<E: Evaluator> Analyzer<E> {
    pub fn new(rules: ActiveRuleSet, evaluator: E) -> Self {
        Self { rules, evaluator }
    }

    /// Evaluate one message against the active set.
    pub async fn analyze(&self, message: &str) -> Result<ComplianceReport, ComplianceError> {
        let rules = self.rules.current();
        let violations = self.evaluator.evaluate(message, &rules).await?;
        Ok(ComplianceReport {
            compliant: violations.is_empty(),
            violations,
        })
    }
}

/// The matching line when it fits, else a window from the match start.
fn excerpt_around(message: &str, offset: usize) -> String {
    let line = message[..offset]
        .rfind('\n')
        .map(|i| &message[i + 1..])
        .unwrap_or(message);
    let line = line.lines().next().unwrap_or(line);

    let mut excerpt: String = line.chars().take(EXCERPT_LEN).collect();
    if line.chars().count() > EXCERPT_LEN {
        excerpt.push('…');
    }
    excerpt
}

#[cfg(test)]
#[path = "analyzer_tests.rs"]
mod tests;
