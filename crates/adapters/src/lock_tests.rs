// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

fn clear_init_markers() {
    // Keep the init-restart path out of these tests
    std::env::remove_var("INVOCATION_ID");
}

#[test]
#[serial]
fn acquire_writes_pid_metadata() {
    clear_init_markers();
    let dir = tempfile::tempdir().unwrap();
    let lock = DaemonLock::acquire("scheduler", dir.path()).unwrap();

    assert_eq!(lock.role(), "scheduler");
    let pid = read_holder_pid(lock.path()).unwrap();
    assert_eq!(pid, std::process::id() as i32);

    let contents = std::fs::read_to_string(lock.path()).unwrap();
    assert!(contents.contains("scheduler"));
}

#[test]
#[serial]
fn second_acquire_conflicts() {
    clear_init_markers();
    let dir = tempfile::tempdir().unwrap();
    let _held = DaemonLock::acquire("queue", dir.path()).unwrap();

    match DaemonLock::acquire("queue", dir.path()) {
        Err(LockError::AlreadyHeld { role, pid }) => {
            assert_eq!(role, "queue");
            assert_eq!(pid, std::process::id() as i32);
        }
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => panic!("expected AlreadyHeld"),
    }
}

#[test]
#[serial]
fn roles_do_not_contend() {
    clear_init_markers();
    let dir = tempfile::tempdir().unwrap();
    let _scheduler = DaemonLock::acquire("scheduler", dir.path()).unwrap();
    let _queue = DaemonLock::acquire("queue", dir.path()).unwrap();
}

#[test]
#[serial]
fn drop_releases_and_removes_the_file() {
    clear_init_markers();
    let dir = tempfile::tempdir().unwrap();
    let path = {
        let lock = DaemonLock::acquire("scheduler", dir.path()).unwrap();
        lock.path().to_path_buf()
    };
    assert!(!path.exists());

    // Reacquire after release
    let _again = DaemonLock::acquire("scheduler", dir.path()).unwrap();
}

#[test]
#[serial]
fn stale_file_without_holder_is_reclaimed() {
    clear_init_markers();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scheduler.lock");
    // Dead pid metadata, nobody holding the range lock
    std::fs::write(&path, "999999\nscheduler\n/nowhere\n").unwrap();

    let lock = DaemonLock::acquire("scheduler", dir.path()).unwrap();
    assert_eq!(
        read_holder_pid(lock.path()).unwrap(),
        std::process::id() as i32
    );
}

#[test]
fn pid_alive_detects_self_and_garbage() {
    assert!(pid_alive(std::process::id() as i32));
    assert!(!pid_alive(999_999_99));
}
