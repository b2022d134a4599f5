//! Error surface: usage mistakes are exit 2, store misses are exit 4.

use crate::prelude::Workspace;

#[test]
fn unknown_subcommand_is_usage_error() {
    let ws = Workspace::new();
    ws.gaffer().arg("frobnicate").assert().code(2);
}

#[test]
fn missing_required_args_is_usage_error() {
    let ws = Workspace::new();
    ws.gaffer().arg("enqueue").assert().code(2);
    ws.gaffer().arg("status").assert().code(2);
}

#[test]
fn unknown_project_id_is_a_store_error() {
    let ws = Workspace::new();
    let output = ws.gaffer().args(["status", "424242"]).output().unwrap();
    assert_eq!(output.status.code(), Some(4));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not found"));
    // Single-line cause
    assert_eq!(stderr.trim().lines().count(), 1);
}

#[test]
fn bogus_status_filter_is_usage_error() {
    let ws = Workspace::new();
    ws.gaffer().args(["list", "--status", "sideways"]).assert().code(2);
}

#[test]
fn malformed_agent_target_is_usage_error() {
    let ws = Workspace::new();
    ws.gaffer().args(["pull", "--agent", "no-window"]).assert().code(2);
}
