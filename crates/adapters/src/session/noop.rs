// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op session controller for headless operation.

use super::{SessionController, SessionError};
use async_trait::async_trait;
use gaffer_core::AgentId;
use std::path::Path;

/// Controller that accepts every call and reports nothing alive.
#[derive(Clone, Copy, Default)]
pub struct NoOpSessionController;

impl NoOpSessionController {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SessionController for NoOpSessionController {
    async fn create_session(
        &self,
        _name: &str,
        _cwd: &Path,
        _windows: &[String],
    ) -> Result<(), SessionError> {
        Ok(())
    }

    async fn kill_session(&self, _name: &str) -> Result<(), SessionError> {
        Ok(())
    }

    async fn list_windows(&self, _session: &str) -> Result<Vec<(u32, String)>, SessionError> {
        Ok(Vec::new())
    }

    async fn create_window(&self, _session: &str, _name: &str) -> Result<u32, SessionError> {
        Ok(0)
    }

    async fn kill_window(&self, _target: &AgentId) -> Result<(), SessionError> {
        Ok(())
    }

    async fn send_keys(&self, _target: &AgentId, _text: &str) -> Result<(), SessionError> {
        Ok(())
    }

    async fn capture_pane(
        &self,
        _target: &AgentId,
        _tail_lines: u32,
    ) -> Result<String, SessionError> {
        Ok(String::new())
    }

    async fn session_alive(&self, _name: &str) -> Result<bool, SessionError> {
        Ok(false)
    }

    async fn session_created_at(&self, _name: &str) -> Result<Option<i64>, SessionError> {
        Ok(None)
    }

    async fn list_sessions(&self) -> Result<Vec<String>, SessionError> {
        Ok(Vec::new())
    }
}
