// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use gaffer_core::ProjectStatus;

#[test]
fn list_line_includes_the_essentials() {
    let project = Project::builder()
        .id(42)
        .spec_path("/s/a.md")
        .project_path("/p/a")
        .status(ProjectStatus::Processing)
        .enqueued_at(100)
        .build();

    let line = project_line(&project, 160);
    assert!(line.contains("42"));
    assert!(line.contains("processing"));
    assert!(line.contains("/s/a.md"));
    assert!(line.contains("(/p/a)"));
    assert!(line.contains("1m"));
}

#[test]
fn detail_skips_absent_fields() {
    let project = Project::builder().id(1).status(ProjectStatus::Queued).build();
    let detail = project_detail(&project, 100);
    assert!(detail.contains("status"));
    assert!(!detail.contains("error"));
    assert!(!detail.contains("session"));
}

#[test]
fn detail_shows_error_and_session() {
    let project = Project::builder()
        .id(1)
        .status(ProjectStatus::Failed)
        .session_name("gaffer-1")
        .error_message("terminated during reboot")
        .build();
    let detail = project_detail(&project, 100);
    assert!(detail.contains("gaffer-1"));
    assert!(detail.contains("terminated during reboot"));
}
