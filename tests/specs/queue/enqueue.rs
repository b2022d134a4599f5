//! Idempotent enqueue through the CLI.

use crate::prelude::Workspace;

#[test]
fn enqueue_prints_a_numeric_id() {
    let ws = Workspace::new();
    let id = ws.enqueue("/s/a.md");
    assert!(id.parse::<i64>().is_ok(), "expected an id, got {id:?}");
}

#[test]
fn repeated_enqueue_returns_the_same_id() {
    let ws = Workspace::new();
    let first = ws.enqueue("/s/a.md");
    let second = ws.enqueue("/s/a.md");
    assert_eq!(first, second);

    // And exactly one row exists
    let output = ws.gaffer().arg("list").output().unwrap();
    let listing = String::from_utf8_lossy(&output.stdout);
    assert_eq!(listing.lines().count(), 1);
}

#[test]
fn distinct_projects_get_distinct_ids() {
    let ws = Workspace::new();
    let a = ws.enqueue("/s/a.md");
    let b = ws.enqueue("/s/b.md");
    assert_ne!(a, b);

    let with_path = ws
        .gaffer()
        .args(["enqueue", "/s/a.md", "--project", "/work/elsewhere"])
        .output()
        .unwrap();
    let c = String::from_utf8_lossy(&with_path.stdout).trim().to_string();
    assert_ne!(a, c);
}

#[test]
fn priority_is_recorded() {
    let ws = Workspace::new();
    let output = ws
        .gaffer()
        .args(["enqueue", "/s/hot.md", "--priority", "9"])
        .output()
        .unwrap();
    let id = String::from_utf8_lossy(&output.stdout).trim().to_string();

    let status = ws.gaffer().args(["status", &id]).output().unwrap();
    let detail = String::from_utf8_lossy(&status.stdout);
    assert!(detail.contains("priority"));
    assert!(detail.contains('9'));
}
