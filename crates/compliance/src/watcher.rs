// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rules-document watcher: debounce, re-extract, swap, and drop a
//! trigger marker so analysers know to reload.

use crate::rules::{extract_rules, ActiveRuleSet};
use crate::ComplianceError;
use gaffer_adapters::watch::watch_file;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Change bursts within this window collapse into one reload.
pub const RULES_DEBOUNCE: Duration = Duration::from_secs(2);

/// Marker file dropped beside the document after each reload.
pub fn trigger_marker_path(rules_path: &Path) -> PathBuf {
    let mut name = rules_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "rules".to_string());
    name.push_str(".reload");
    rules_path.with_file_name(name)
}

/// Load the document and swap the active set. Returns the rule count.
pub fn reload_rules(rules_path: &Path, active: &ActiveRuleSet) -> Result<usize, ComplianceError> {
    let document = std::fs::read_to_string(rules_path)?;
    let rules = extract_rules(&document);
    let count = rules.len();
    active.swap(rules);
    Ok(count)
}

/// Watch the rules document until cancelled. On each debounced change:
/// re-run the extractor, swap the active set, and touch the trigger
/// marker.
pub async fn run_rules_watcher(
    rules_path: PathBuf,
    active: ActiveRuleSet,
    cancel: CancellationToken,
) {
    // Initial load; a missing document is an empty rule set until it appears.
    match reload_rules(&rules_path, &active) {
        Ok(count) => info!(path = %rules_path.display(), count, "rules loaded"),
        Err(e) => warn!(path = %rules_path.display(), error = %e, "rules document not loaded"),
    }

    let (_guard, mut changes) = match watch_file(&rules_path) {
        Ok(watch) => watch,
        Err(e) => {
            warn!(path = %rules_path.display(), error = %e, "rules watcher unavailable");
            return;
        }
    };

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            tick = changes.recv() => {
                if tick.is_none() {
                    return;
                }
                // Debounce: swallow the burst until it quiets down
                loop {
                    match tokio::time::timeout(RULES_DEBOUNCE, changes.recv()).await {
                        Ok(Some(())) => continue,
                        Ok(None) => return,
                        Err(_) => break,
                    }
                }

                match reload_rules(&rules_path, &active) {
                    Ok(count) => {
                        info!(count, "rules document changed, rule set reloaded");
                        let marker = trigger_marker_path(&rules_path);
                        if let Err(e) = std::fs::write(&marker, epoch_secs_string()) {
                            warn!(error = %e, "failed to write reload marker");
                        }
                    }
                    Err(e) => warn!(error = %e, "rules reload failed, keeping previous set"),
                }
            }
        }
    }
}

/// Epoch-seconds timestamp for the marker file.
fn epoch_secs_string() -> String {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
        .to_string()
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
