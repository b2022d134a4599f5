// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tmux session controller

use super::{SessionController, SessionError};
use crate::subprocess::{run_with_timeout, TMUX_TIMEOUT};
use async_trait::async_trait;
use gaffer_core::AgentId;
use std::path::Path;
use tokio::process::Command;

/// Tmux-backed session controller
#[derive(Clone, Default)]
pub struct TmuxController;

impl TmuxController {
    pub fn new() -> Self {
        Self
    }

    async fn tmux(&self, args: &[&str], description: &str) -> Result<std::process::Output, SessionError> {
        let mut cmd = Command::new("tmux");
        cmd.args(args);
        run_with_timeout(cmd, TMUX_TIMEOUT, description)
            .await
            .map_err(SessionError::CommandFailed)
    }
}

#[async_trait]
impl SessionController for TmuxController {
    async fn create_session(
        &self,
        name: &str,
        cwd: &Path,
        windows: &[String],
    ) -> Result<(), SessionError> {
        if !cwd.exists() {
            return Err(SessionError::SpawnFailed(format!(
                "working directory does not exist: {}",
                cwd.display()
            )));
        }

        if self.session_alive(name).await? {
            return Err(SessionError::Exists(name.to_string()));
        }

        let cwd_str = cwd.display().to_string();
        let first_window = windows.first().map(String::as_str).unwrap_or("main");
        let output = self
            .tmux(
                &["new-session", "-d", "-s", name, "-c", &cwd_str, "-n", first_window],
                "tmux new-session",
            )
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!(session = name, stderr = %stderr, "tmux new-session failed");
            return Err(SessionError::SpawnFailed(stderr.to_string()));
        }

        for window in windows.iter().skip(1) {
            self.create_window(name, window).await?;
        }

        Ok(())
    }

    async fn kill_session(&self, name: &str) -> Result<(), SessionError> {
        // Session might already be dead, which is fine
        let _ = self.tmux(&["kill-session", "-t", name], "tmux kill-session").await?;
        Ok(())
    }

    async fn list_windows(&self, session: &str) -> Result<Vec<(u32, String)>, SessionError> {
        let output = self
            .tmux(
                &[
                    "list-windows",
                    "-t",
                    session,
                    "-F",
                    "#{window_index}\t#{window_name}",
                ],
                "tmux list-windows",
            )
            .await?;

        if !output.status.success() {
            return Err(SessionError::NotFound(session.to_string()));
        }

        let listing = String::from_utf8_lossy(&output.stdout);
        let mut windows = Vec::new();
        for line in listing.lines() {
            if let Some((index, name)) = line.split_once('\t') {
                if let Ok(index) = index.trim().parse::<u32>() {
                    windows.push((index, name.to_string()));
                }
            }
        }
        Ok(windows)
    }

    async fn create_window(&self, session: &str, name: &str) -> Result<u32, SessionError> {
        let target = format!("{session}:");
        let output = self
            .tmux(
                &[
                    "new-window",
                    "-d",
                    "-t",
                    &target,
                    "-n",
                    name,
                    "-P",
                    "-F",
                    "#{window_index}",
                ],
                "tmux new-window",
            )
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SessionError::CommandFailed(stderr.to_string()));
        }

        String::from_utf8_lossy(&output.stdout)
            .trim()
            .parse::<u32>()
            .map_err(|e| SessionError::CommandFailed(format!("bad window index: {e}")))
    }

    async fn kill_window(&self, target: &AgentId) -> Result<(), SessionError> {
        let output = self
            .tmux(&["kill-window", "-t", target.as_str()], "tmux kill-window")
            .await?;
        if !output.status.success() {
            return Err(SessionError::NotFound(target.to_string()));
        }
        Ok(())
    }

    async fn send_keys(&self, target: &AgentId, text: &str) -> Result<(), SessionError> {
        // -l = literal mode (no key name interpretation)
        // -- = end of options (handles text starting with -)
        let output = self
            .tmux(
                &["send-keys", "-t", target.as_str(), "-l", "--", text],
                "tmux send-keys",
            )
            .await?;
        if !output.status.success() {
            return Err(SessionError::NotFound(target.to_string()));
        }

        let output = self
            .tmux(
                &["send-keys", "-t", target.as_str(), "Enter"],
                "tmux send-keys enter",
            )
            .await?;
        if !output.status.success() {
            return Err(SessionError::NotFound(target.to_string()));
        }
        Ok(())
    }

    async fn capture_pane(
        &self,
        target: &AgentId,
        tail_lines: u32,
    ) -> Result<String, SessionError> {
        let start = format!("-{tail_lines}");
        let output = self
            .tmux(
                &["capture-pane", "-t", target.as_str(), "-p", "-S", &start],
                "tmux capture-pane",
            )
            .await?;

        if !output.status.success() {
            return Err(SessionError::NotFound(target.to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn session_alive(&self, name: &str) -> Result<bool, SessionError> {
        let output = self
            .tmux(&["has-session", "-t", name], "tmux has-session")
            .await?;
        Ok(output.status.success())
    }

    async fn session_created_at(&self, name: &str) -> Result<Option<i64>, SessionError> {
        let output = self
            .tmux(
                &["display-message", "-t", name, "-p", "#{session_created}"],
                "tmux display-message",
            )
            .await?;

        if !output.status.success() {
            return Ok(None);
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().parse().ok())
    }

    async fn list_sessions(&self) -> Result<Vec<String>, SessionError> {
        let output = self
            .tmux(&["list-sessions", "-F", "#{session_name}"], "tmux list-sessions")
            .await?;

        // No server running reads as no sessions
        if !output.status.success() {
            return Ok(Vec::new());
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .collect())
    }
}
