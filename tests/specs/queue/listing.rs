//! List and status output.

use crate::prelude::Workspace;

#[test]
fn empty_queue_lists_nothing() {
    let ws = Workspace::new();
    let output = ws.gaffer().arg("list").output().unwrap();
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn list_shows_status_and_spec() {
    let ws = Workspace::new();
    let id = ws.enqueue("/s/webshop.md");

    let output = ws.gaffer().arg("list").output().unwrap();
    let listing = String::from_utf8_lossy(&output.stdout);
    assert!(listing.contains(&id));
    assert!(listing.contains("queued"));
    assert!(listing.contains("/s/webshop.md"));
}

#[test]
fn status_filter_narrows_the_listing() {
    let ws = Workspace::new();
    ws.enqueue("/s/a.md");

    let queued = ws.gaffer().args(["list", "--status", "queued"]).output().unwrap();
    assert_eq!(String::from_utf8_lossy(&queued.stdout).lines().count(), 1);

    let failed = ws.gaffer().args(["list", "--status", "failed"]).output().unwrap();
    assert!(failed.stdout.is_empty());
}

#[test]
fn status_shows_the_full_row() {
    let ws = Workspace::new();
    let id = ws.enqueue("/s/detail.md");

    let output = ws.gaffer().args(["status", &id]).output().unwrap();
    let detail = String::from_utf8_lossy(&output.stdout);
    assert!(detail.contains("queued"));
    assert!(detail.contains("/s/detail.md"));
    assert!(detail.contains("retries"));
}
