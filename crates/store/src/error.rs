// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store error kinds.

use gaffer_core::{MessageId, ProjectStatus};
use thiserror::Error;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("illegal transition: {from} -> {to}")]
    IllegalTransition {
        from: ProjectStatus,
        to: ProjectStatus,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("dependency cycle at message {0}")]
    DependencyCycle(MessageId),

    #[error("store busy after retries")]
    Busy,

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    /// Whether the underlying failure is a transient lock conflict.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Busy => true,
            StoreError::Sqlite(rusqlite::Error::SqliteFailure(e, _)) => {
                matches!(
                    e.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                )
            }
            _ => false,
        }
    }
}
