// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error kinds.

use gaffer_adapters::{LockError, ProcessError, SessionError};
use gaffer_core::AgentId;
use gaffer_store::StoreError;
use thiserror::Error;

/// Errors surfaced by the policy layer.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("agent unknown: {0}")]
    AgentUnknown(AgentId),

    #[error("message budget exceeded for {0}")]
    BudgetExceeded(AgentId),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("session adapter: {0}")]
    Session(#[from] SessionError),

    #[error("process manager: {0}")]
    Process(#[from] ProcessError),

    #[error("lock: {0}")]
    Lock(#[from] LockError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
