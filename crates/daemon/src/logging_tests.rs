// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn small_logs_are_left_alone() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gafferd-queue.log");
    std::fs::write(&path, "short").unwrap();

    rotate_log_if_needed(&path);
    assert!(path.exists());
    assert!(!dir.path().join("gafferd-queue.log.1").exists());
}

#[test]
fn oversized_logs_shift_down() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gafferd-queue.log");

    std::fs::write(&path, vec![b'x'; 11 * 1024 * 1024]).unwrap();
    std::fs::write(dir.path().join("gafferd-queue.log.1"), "old-1").unwrap();

    rotate_log_if_needed(&path);

    assert!(!path.exists());
    // Current became .1, old .1 became .2
    let rotated = std::fs::metadata(dir.path().join("gafferd-queue.log.1")).unwrap();
    assert!(rotated.len() > 10 * 1024 * 1024);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("gafferd-queue.log.2")).unwrap(),
        "old-1"
    );
}

#[test]
fn missing_log_is_a_noop() {
    rotate_log_if_needed(std::path::Path::new("/nonexistent/dir/file.log"));
}
