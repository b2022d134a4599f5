// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gaffer-daemon: composition of the two singleton daemons.
//!
//! `run_scheduler` fires periodic check-ins and does message-bus
//! maintenance; `run_queue` owns admission, process supervision, the
//! phantom/zombie sweep, compliance, and the event-log/notifier pair.
//! Both share the store; each holds its own singleton lock.

pub mod config;
pub mod env;
pub mod logging;
pub mod queue_daemon;
pub mod scheduler_daemon;

pub use config::DaemonConfig;
pub use queue_daemon::run_queue;
pub use scheduler_daemon::run_scheduler;

use gaffer_adapters::LockError;
use gaffer_engine::EngineError;
use gaffer_store::StoreError;
use thiserror::Error;

/// Daemon roles, one singleton lock each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonRole {
    Scheduler,
    QueueProcessor,
}

impl DaemonRole {
    pub fn lock_name(&self) -> &'static str {
        match self {
            DaemonRole::Scheduler => "scheduler",
            DaemonRole::QueueProcessor => "queue-processor",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scheduler" => Some(Self::Scheduler),
            "queue" | "queue-processor" => Some(Self::QueueProcessor),
            _ => None,
        }
    }
}

gaffer_core::simple_display! {
    DaemonRole {
        Scheduler => "scheduler",
        QueueProcessor => "queue-processor",
    }
}

/// Daemon-level errors.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("could not determine state directory")]
    NoStateDir,

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
