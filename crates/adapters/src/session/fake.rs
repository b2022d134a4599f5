// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake session controller for testing

use super::{SessionController, SessionError};
use async_trait::async_trait;
use gaffer_core::AgentId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Recorded session call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCall {
    CreateSession {
        name: String,
        cwd: PathBuf,
        windows: Vec<String>,
    },
    KillSession {
        name: String,
    },
    CreateWindow {
        session: String,
        name: String,
    },
    KillWindow {
        target: String,
    },
    SendKeys {
        target: String,
        text: String,
    },
    CapturePane {
        target: String,
        tail_lines: u32,
    },
}

#[derive(Debug, Clone)]
struct FakeSession {
    windows: Vec<(u32, String)>,
    window_output: HashMap<String, String>,
    alive: bool,
    created_at: i64,
}

#[derive(Default)]
struct FakeState {
    sessions: HashMap<String, FakeSession>,
    calls: Vec<SessionCall>,
}

/// In-memory session controller that records calls and serves
/// scripted liveness and pane output.
#[derive(Clone, Default)]
pub struct FakeSessionController {
    inner: Arc<Mutex<FakeState>>,
}

impl FakeSessionController {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<SessionCall> {
        self.inner.lock().calls.clone()
    }

    /// Keystrokes sent to one target.
    pub fn sent_keys(&self, target: &str) -> Vec<String> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                SessionCall::SendKeys { target: t, text } if t == target => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Seed a pre-existing session (for liveness/recovery tests).
    pub fn add_session(&self, name: &str, windows: &[&str], created_at: i64) {
        self.inner.lock().sessions.insert(
            name.to_string(),
            FakeSession {
                windows: windows
                    .iter()
                    .enumerate()
                    .map(|(i, w)| (i as u32, w.to_string()))
                    .collect(),
                window_output: HashMap::new(),
                alive: true,
                created_at,
            },
        );
    }

    /// Mark a session dead without removing it.
    pub fn set_dead(&self, name: &str) {
        if let Some(session) = self.inner.lock().sessions.get_mut(name) {
            session.alive = false;
        }
    }

    /// Script the pane output served for `session:window`.
    pub fn set_pane_output(&self, target: &AgentId, output: &str) {
        if let Some(session) = self.inner.lock().sessions.get_mut(target.session()) {
            session
                .window_output
                .insert(target.window().to_string(), output.to_string());
        }
    }
}

#[async_trait]
impl SessionController for FakeSessionController {
    async fn create_session(
        &self,
        name: &str,
        cwd: &Path,
        windows: &[String],
    ) -> Result<(), SessionError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SessionCall::CreateSession {
            name: name.to_string(),
            cwd: cwd.to_path_buf(),
            windows: windows.to_vec(),
        });

        if inner.sessions.get(name).map(|s| s.alive).unwrap_or(false) {
            return Err(SessionError::Exists(name.to_string()));
        }

        inner.sessions.insert(
            name.to_string(),
            FakeSession {
                windows: windows
                    .iter()
                    .enumerate()
                    .map(|(i, w)| (i as u32, w.clone()))
                    .collect(),
                window_output: HashMap::new(),
                alive: true,
                created_at: 0,
            },
        );
        Ok(())
    }

    async fn kill_session(&self, name: &str) -> Result<(), SessionError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SessionCall::KillSession {
            name: name.to_string(),
        });
        if let Some(session) = inner.sessions.get_mut(name) {
            session.alive = false;
        }
        Ok(())
    }

    async fn list_windows(&self, session: &str) -> Result<Vec<(u32, String)>, SessionError> {
        let inner = self.inner.lock();
        match inner.sessions.get(session).filter(|s| s.alive) {
            Some(s) => Ok(s.windows.clone()),
            None => Err(SessionError::NotFound(session.to_string())),
        }
    }

    async fn create_window(&self, session: &str, name: &str) -> Result<u32, SessionError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SessionCall::CreateWindow {
            session: session.to_string(),
            name: name.to_string(),
        });
        let Some(s) = inner.sessions.get_mut(session) else {
            return Err(SessionError::NotFound(session.to_string()));
        };
        let index = s.windows.iter().map(|(i, _)| i + 1).max().unwrap_or(0);
        s.windows.push((index, name.to_string()));
        Ok(index)
    }

    async fn kill_window(&self, target: &AgentId) -> Result<(), SessionError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SessionCall::KillWindow {
            target: target.to_string(),
        });
        let Some(s) = inner.sessions.get_mut(target.session()) else {
            return Err(SessionError::NotFound(target.to_string()));
        };
        s.windows.retain(|(_, name)| name != target.window());
        Ok(())
    }

    async fn send_keys(&self, target: &AgentId, text: &str) -> Result<(), SessionError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SessionCall::SendKeys {
            target: target.to_string(),
            text: text.to_string(),
        });
        if !inner
            .sessions
            .get(target.session())
            .map(|s| s.alive)
            .unwrap_or(false)
        {
            return Err(SessionError::NotFound(target.to_string()));
        }
        Ok(())
    }

    async fn capture_pane(
        &self,
        target: &AgentId,
        tail_lines: u32,
    ) -> Result<String, SessionError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SessionCall::CapturePane {
            target: target.to_string(),
            tail_lines,
        });
        match inner.sessions.get(target.session()).filter(|s| s.alive) {
            Some(s) => Ok(s
                .window_output
                .get(target.window())
                .cloned()
                .unwrap_or_default()),
            None => Err(SessionError::NotFound(target.to_string())),
        }
    }

    async fn session_alive(&self, name: &str) -> Result<bool, SessionError> {
        let inner = self.inner.lock();
        Ok(inner.sessions.get(name).map(|s| s.alive).unwrap_or(false))
    }

    async fn session_created_at(&self, name: &str) -> Result<Option<i64>, SessionError> {
        let inner = self.inner.lock();
        Ok(inner
            .sessions
            .get(name)
            .filter(|s| s.alive)
            .map(|s| s.created_at))
    }

    async fn list_sessions(&self) -> Result<Vec<String>, SessionError> {
        let inner = self.inner.lock();
        let mut names: Vec<String> = inner
            .sessions
            .iter()
            .filter(|(_, s)| s.alive)
            .map(|(n, _)| n.clone())
            .collect();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
