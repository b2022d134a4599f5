// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::error::StoreError;

#[test]
fn clones_share_the_connection() {
    let store = Store::open_in_memory().unwrap();
    let clone = store.clone();

    let id = store.enqueue_project("/s/a.md", None, 0, None, 1).unwrap();
    assert_eq!(clone.get_project(id).unwrap().id, id);
}

#[test]
fn two_handles_on_one_file_see_each_other() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gaffer.db");

    // Separate connections, as the two daemons would hold
    let writer = Store::open(&path).unwrap();
    let reader = Store::open(&path).unwrap();

    let id = writer.enqueue_project("/s/a.md", None, 0, None, 1).unwrap();
    assert_eq!(reader.get_project(id).unwrap().spec_path, "/s/a.md");
}

#[test]
fn not_found_is_not_transient() {
    let err = StoreError::NotFound("project 7".to_string());
    assert!(!err.is_transient());
    assert!(StoreError::Busy.is_transient());
}
