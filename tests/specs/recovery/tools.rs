//! Recovery tooling against a fresh store.

use crate::prelude::Workspace;

#[test]
fn list_stuck_reports_a_quiet_queue() {
    let ws = Workspace::new();
    let output = ws.gaffer().args(["recovery", "list-stuck"]).output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("no stuck projects"));
}

#[test]
fn reset_of_unknown_row_is_a_store_error() {
    let ws = Workspace::new();
    ws.gaffer().args(["recovery", "reset", "424242"]).assert().code(4);
}

#[test]
fn reset_requeues_and_reports() {
    let ws = Workspace::new();
    let id = ws.enqueue("/s/a.md");

    // A queued row resets to failed with --failed
    let output = ws
        .gaffer()
        .args(["recovery", "reset", &id, "--failed"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("failed"));

    // Terminal now: plain reset refuses, --force requeues
    ws.gaffer().args(["recovery", "reset", &id]).assert().code(4);
    let output = ws
        .gaffer()
        .args(["recovery", "reset", &id, "--force"])
        .output()
        .unwrap();
    assert!(String::from_utf8_lossy(&output.stdout).contains("queued"));
}

#[test]
fn kill_zombie_refuses_non_zombies() {
    let ws = Workspace::new();
    let id = ws.enqueue("/s/a.md");
    ws.gaffer().args(["recovery", "kill-zombie", &id]).assert().code(4);
}

#[test]
fn diagnostics_dumps_all_sections() {
    let ws = Workspace::new();
    ws.enqueue("/s/a.md");

    let output = ws.gaffer().args(["recovery", "diagnostics"]).output().unwrap();
    assert!(output.status.success());
    let report = String::from_utf8_lossy(&output.stdout);
    assert!(report.contains("# store"));
    assert!(report.contains("projects.queued"));
    assert!(report.contains("# locks"));
    assert!(report.contains("scheduler"));
    assert!(report.contains("# sessions"));
}
