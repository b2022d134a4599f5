// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Custom error type that carries a process exit code.
//!
//! Commands return `ExitError` instead of calling `std::process::exit()`
//! directly, allowing `main()` to handle process termination.
//!
//! Codes: 0 success, 2 usage (clap), 3 conflict/singleton, 4 store
//! error, 5 subprocess timeout.

use gaffer_adapters::{LockError, SessionError};
use gaffer_engine::EngineError;
use gaffer_store::StoreError;
use std::fmt;

#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}

impl From<StoreError> for ExitError {
    fn from(e: StoreError) -> Self {
        Self::new(4, e.to_string())
    }
}

impl From<LockError> for ExitError {
    fn from(e: LockError) -> Self {
        let code = match e {
            LockError::AlreadyHeld { .. } => 3,
            LockError::Io(_) => 4,
        };
        Self::new(code, e.to_string())
    }
}

impl From<EngineError> for ExitError {
    fn from(e: EngineError) -> Self {
        let code = match &e {
            EngineError::Store(_) => 4,
            EngineError::Lock(LockError::AlreadyHeld { .. }) => 3,
            EngineError::Session(SessionError::CommandFailed(msg)) if msg.contains("timed out") => 5,
            _ => 1,
        };
        Self::new(code, e.to_string())
    }
}

impl From<gaffer_daemon::DaemonError> for ExitError {
    fn from(e: gaffer_daemon::DaemonError) -> Self {
        match e {
            gaffer_daemon::DaemonError::Lock(lock) => lock.into(),
            gaffer_daemon::DaemonError::Store(store) => store.into(),
            gaffer_daemon::DaemonError::Engine(engine) => engine.into(),
            other => Self::new(4, other.to_string()),
        }
    }
}

#[cfg(test)]
#[path = "exit_error_tests.rs"]
mod tests;
