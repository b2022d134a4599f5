// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal-multiplexer session controller.
//!
//! One session per project, one window per agent role. Targets use the
//! `session:window` form carried by [`AgentId`].

mod noop;
mod tmux;

pub use noop::NoOpSessionController;
pub use tmux::TmuxController;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeSessionController, SessionCall};

use async_trait::async_trait;
use gaffer_core::AgentId;
use std::path::Path;
use thiserror::Error;

/// Errors from session operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(String),
    #[error("session already exists: {0}")]
    Exists(String),
    #[error("window not found: {session}:{window}")]
    WindowNotFound { session: String, window: String },
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error("command failed: {0}")]
    CommandFailed(String),
}

/// Adapter over the terminal multiplexer. Pure mechanism; all
/// scheduling policy lives above this layer.
#[async_trait]
pub trait SessionController: Clone + Send + Sync + 'static {
    /// Create a named session with one window per entry in `windows`.
    /// Fails with [`SessionError::Exists`] if the name is taken.
    async fn create_session(
        &self,
        name: &str,
        cwd: &Path,
        windows: &[String],
    ) -> Result<(), SessionError>;

    /// Kill a session. Killing a dead session is not an error.
    async fn kill_session(&self, name: &str) -> Result<(), SessionError>;

    /// List `(index, name)` pairs for a session's windows.
    async fn list_windows(&self, session: &str) -> Result<Vec<(u32, String)>, SessionError>;

    /// Create an additional window, returning its index.
    async fn create_window(&self, session: &str, name: &str) -> Result<u32, SessionError>;

    /// Kill one window.
    async fn kill_window(&self, target: &AgentId) -> Result<(), SessionError>;

    /// Inject a line of text followed by a submission keystroke.
    async fn send_keys(&self, target: &AgentId, text: &str) -> Result<(), SessionError>;

    /// Most recent `tail_lines` of visible pane output.
    async fn capture_pane(&self, target: &AgentId, tail_lines: u32) -> Result<String, SessionError>;

    /// Whether a session exists.
    async fn session_alive(&self, name: &str) -> Result<bool, SessionError>;

    /// Epoch seconds when the session was created, if it exists.
    async fn session_created_at(&self, name: &str) -> Result<Option<i64>, SessionError>;

    /// Names of all live sessions. An unreachable multiplexer server
    /// reads as no sessions.
    async fn list_sessions(&self) -> Result<Vec<String>, SessionError>;

    /// Resolve a window by exact name; a numeric index is accepted as
    /// fallback when it exists.
    async fn resolve_window(&self, session: &str, name_or_index: &str) -> Result<u32, SessionError> {
        let windows = self.list_windows(session).await?;
        if let Some((index, _)) = windows.iter().find(|(_, name)| name == name_or_index) {
            return Ok(*index);
        }
        if let Ok(index) = name_or_index.parse::<u32>() {
            if windows.iter().any(|(i, _)| *i == index) {
                return Ok(index);
            }
        }
        Err(SessionError::WindowNotFound {
            session: session.to_string(),
            window: name_or_index.to_string(),
        })
    }
}
