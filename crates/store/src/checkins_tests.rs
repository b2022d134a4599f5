// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::Store;
use gaffer_core::test_support::agent;
use gaffer_core::COMPLETION_REPORT_CAUSE;

fn store() -> Store {
    Store::open_in_memory().unwrap()
}

#[test]
fn due_selection_and_refire() {
    let store = store();
    let id = store
        .create_checkin(&agent(1), 100, 1800, "30-min check-in", "")
        .unwrap();

    assert!(store.due_checkins(99).unwrap().is_empty());

    let due = store.due_checkins(100).unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].id, id);
    assert!(due[0].last_run_at.is_none());

    store.mark_checkin_fired(id, 100).unwrap();
    assert!(store.due_checkins(101).unwrap().is_empty());

    let refire = store.due_checkins(1900).unwrap();
    assert_eq!(refire.len(), 1);
    assert_eq!(refire[0].last_run_at, Some(100));
    assert_eq!(refire[0].next_run_at, 1900);
}

#[test]
fn reschedule_pushes_without_recording_a_run() {
    let store = store();
    let id = store
        .create_checkin(&agent(1), 100, 600, "check in", "")
        .unwrap();

    store.reschedule_checkin(id, 5000).unwrap();
    assert!(store.due_checkins(4999).unwrap().is_empty());
    let due = store.due_checkins(5000).unwrap();
    assert_eq!(due.len(), 1);
    assert!(due[0].last_run_at.is_none());
}

#[test]
fn completion_report_cause_is_preserved() {
    let store = store();
    store
        .create_checkin(&agent(1), 100, 600, "report completion", COMPLETION_REPORT_CAUSE)
        .unwrap();
    let due = store.due_checkins(100).unwrap();
    assert!(due[0].is_completion_report());
}

#[test]
fn delete_for_agent_removes_all_tasks() {
    let store = store();
    store.create_checkin(&agent(1), 100, 600, "a", "").unwrap();
    store.create_checkin(&agent(1), 200, 600, "b", "").unwrap();
    store.create_checkin(&agent(2), 100, 600, "c", "").unwrap();

    assert_eq!(store.delete_checkins_for_agent(&agent(1)).unwrap(), 2);
    assert_eq!(store.list_checkins().unwrap().len(), 1);
}

#[test]
fn unknown_task_operations_fail() {
    let store = store();
    assert!(store.mark_checkin_fired(42, 100).is_err());
    assert!(store.reschedule_checkin(42, 100).is_err());
}
