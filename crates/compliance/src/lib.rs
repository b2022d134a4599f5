// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gaffer-compliance: rules-document ingestion and message analysis.
//!
//! The rules document is plain text with category headings; the
//! extractor turns it into [`gaffer_core::Rule`]s with stable
//! per-category ids. The analyser evaluates every recorded
//! agent-to-agent message against the active set, through an external
//! AI evaluator when one is configured and a deterministic pattern
//! evaluator otherwise. Non-compliant messages become violation
//! events, deduplicated within a sliding window.

mod analyzer;
mod emitter;
mod rules;
mod watcher;

pub use analyzer::{Analyzer, ComplianceReport, Evaluator, PatternEvaluator, RuleMatch};
pub use emitter::ViolationEmitter;
pub use rules::{extract_rules, ActiveRuleSet};
pub use watcher::{run_rules_watcher, trigger_marker_path, RULES_DEBOUNCE};

use thiserror::Error;

/// Errors from the compliance engine.
#[derive(Debug, Error)]
pub enum ComplianceError {
    #[error("rules document unreadable: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad rule pattern {pattern:?}: {source}")]
    BadPattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("evaluator failed: {0}")]
    Evaluator(String),
}
