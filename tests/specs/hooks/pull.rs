//! The agent pull hook.

use crate::prelude::Workspace;

#[test]
fn empty_queue_pull_prints_nothing() {
    let ws = Workspace::new();
    let output = ws
        .gaffer()
        .args(["pull", "--agent", "gaffer-1:orchestrator"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(output.stdout.is_empty(), "empty reply means no message");
}

#[test]
fn first_pull_registers_then_check_idle_works() {
    let ws = Workspace::new();

    // check-idle before any contact: agent unknown
    ws.gaffer()
        .args(["pull", "--agent", "gaffer-1:developer", "--check-idle"])
        .assert()
        .code(1);

    // A plain pull is first contact
    ws.gaffer()
        .args(["pull", "--agent", "gaffer-1:developer"])
        .assert()
        .success();

    ws.gaffer()
        .args(["pull", "--agent", "gaffer-1:developer", "--check-idle"])
        .assert()
        .success();
}

#[test]
fn rebrief_returns_a_priority_200_record() {
    let ws = Workspace::new();
    std::fs::write(ws.state.path().join("rules.md"), "# Communication\n- be kind\n").unwrap();

    let output = ws
        .gaffer()
        .args(["pull", "--agent", "gaffer-1:developer", "--rebrief"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let record: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("one JSON record");
    assert_eq!(record["priority"], 200);
    assert_eq!(record["is_rebrief"], true);
    assert!(record["payload"].as_str().unwrap().contains("be kind"));
}

#[test]
fn session_end_takes_the_agent_off_the_bus() {
    let ws = Workspace::new();
    ws.gaffer()
        .args(["pull", "--agent", "gaffer-1:developer"])
        .assert()
        .success();

    ws.gaffer()
        .args(["pull", "--agent", "gaffer-1:developer", "--session-end"])
        .assert()
        .success();

    // Clean end removed the row: idle probe is unknown again
    ws.gaffer()
        .args(["pull", "--agent", "gaffer-1:developer", "--check-idle"])
        .assert()
        .code(1);
}

#[test]
fn conflicting_modes_are_usage_errors() {
    let ws = Workspace::new();
    ws.gaffer()
        .args(["pull", "--agent", "s:1", "--bootstrap", "--rebrief"])
        .assert()
        .code(2);
}
