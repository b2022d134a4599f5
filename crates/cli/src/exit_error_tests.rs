// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn store_errors_map_to_4() {
    let err: ExitError = StoreError::NotFound("project 7".to_string()).into();
    assert_eq!(err.code, 4);
    assert!(err.message.contains("project 7"));
}

#[test]
fn lock_conflicts_map_to_3() {
    let err: ExitError = LockError::AlreadyHeld {
        role: "scheduler".to_string(),
        pid: 42,
    }
    .into();
    assert_eq!(err.code, 3);
}

#[test]
fn session_timeouts_map_to_5() {
    let err: ExitError =
        EngineError::Session(SessionError::CommandFailed("tmux kill-session timed out after 10s".to_string()))
            .into();
    assert_eq!(err.code, 5);
}

#[test]
fn engine_store_errors_keep_code_4() {
    let err: ExitError = EngineError::Store(StoreError::Busy).into();
    assert_eq!(err.code, 4);
}
