// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn builtin_orchestrator_has_all_flags() {
    let roles = Role::builtin();
    let orchestrator = Role::find(&roles, "orchestrator").unwrap();
    assert!(orchestrator.orchestrates);
    assert!(orchestrator.schedules_checkins);
    assert!(orchestrator.mediates_messages);
}

#[test]
fn builtin_worker_roles_have_no_flags() {
    let roles = Role::builtin();
    let developer = Role::find(&roles, "developer").unwrap();
    assert!(!developer.orchestrates);
    assert!(!developer.schedules_checkins);
}

#[test]
fn find_unknown_role() {
    assert!(Role::find(&Role::builtin(), "nope").is_none());
}

#[test]
fn extras_extend_the_table() {
    let roles = Role::with_extras(vec![Role::new("reviewer")]);
    assert!(Role::find(&roles, "reviewer").is_some());
    assert!(Role::find(&roles, "orchestrator").is_some());
}

#[test]
fn extras_override_builtins_by_name() {
    let mut custom = Role::new("developer");
    custom.schedules_checkins = true;
    let roles = Role::with_extras(vec![custom]);

    let developer = Role::find(&roles, "developer").unwrap();
    assert!(developer.schedules_checkins);
    // No duplicate row
    assert_eq!(roles.iter().filter(|r| r.name == "developer").count(), 1);
}

#[test]
fn roles_deserialize_with_defaulted_flags() {
    let role: Role = serde_json::from_str(r#"{"name": "scribe"}"#).unwrap();
    assert_eq!(role.name, "scribe");
    assert!(!role.orchestrates);
}
