// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-file change watcher.
//!
//! Watches the parent directory (editors replace files by rename) and
//! forwards a unit tick for every event touching the watched path.
//! Debouncing is the consumer's concern.

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("watch target has no parent directory: {0}")]
    NoParent(PathBuf),
    #[error("watcher failed: {0}")]
    Notify(#[from] notify::Error),
}

/// Keeps the underlying watcher alive; dropping it stops the stream.
pub struct WatcherGuard {
    // NOTE(lifetime): held so the OS watch survives as long as the guard
    #[allow(dead_code)]
    watcher: RecommendedWatcher,
}

/// Watch one file for changes. Returns a guard plus a channel that
/// ticks on every create/modify/rename touching the file.
pub fn watch_file(path: &Path) -> Result<(WatcherGuard, mpsc::Receiver<()>), WatchError> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| WatchError::NoParent(path.to_path_buf()))?
        .to_path_buf();
    let target = path.to_path_buf();

    let (tx, rx) = mpsc::channel(32);
    let mut watcher = notify::recommended_watcher(move |result: Result<Event, notify::Error>| {
        let Ok(event) = result else { return };
        if event.paths.iter().any(|p| p == &target) {
            // Full channel means a tick is already queued
            let _ = tx.try_send(());
        }
    })?;

    watcher.watch(&parent, RecursiveMode::NonRecursive)?;

    Ok((WatcherGuard { watcher }, rx))
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod tests;
