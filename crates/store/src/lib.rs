// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gaffer-store: the persistent store shared by both daemons.
//!
//! A single embedded SQLite database holds the project queue, the agent
//! message queue, agent records, context snapshots, check-in tasks, and
//! the message sequence counter. Transactions are the only
//! synchronization primitive between the scheduler daemon, the queue
//! daemon, the CLI, and the agent pull hooks.

mod agents;
mod checkins;
mod error;
mod messages;
mod projects;
mod schema;
mod store;

pub use error::StoreError;
pub use messages::{EnqueueMessage, PullOutcome, DEFAULT_DEPENDENCY_TIMEOUT_SECS};
pub use projects::{DiagnosticsSummary, StatusCount, TransitionUpdate};
pub use store::Store;
