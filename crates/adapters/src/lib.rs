// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gaffer-adapters: thin wrappers around the external collaborators.
//!
//! Everything here is mechanism, no policy: the tmux session controller,
//! the supervised-subprocess manager, the singleton lock guard, the
//! rules-document file watcher, and desktop notifications.

pub mod lock;
pub mod notify;
pub mod process;
pub mod session;
pub mod subprocess;
pub mod watch;

pub use lock::{DaemonLock, LockError};
pub use notify::{DesktopNotifyAdapter, NoOpNotifyAdapter, NotifyAdapter, NotifyError};
pub use process::{
    ProcessError, ProcessEvent, ProcessHandle, ProcessManager, ProcessOutcome, ResourceCaps,
    SpawnSpec,
};
pub use session::{NoOpSessionController, SessionController, SessionError, TmuxController};
pub use subprocess::run_with_timeout;
pub use watch::{watch_file, WatchError, WatcherGuard};

#[cfg(any(test, feature = "test-support"))]
pub use notify::{FakeNotifyAdapter, NotifyCall};
#[cfg(any(test, feature = "test-support"))]
pub use session::{FakeSessionController, SessionCall};
