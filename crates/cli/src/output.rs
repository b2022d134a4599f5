// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plain-text output helpers.

use gaffer_core::{format_elapsed, Project};

/// One queue row for `gaffer list`.
pub fn project_line(project: &Project, now: i64) -> String {
    let age = format_elapsed(now.saturating_sub(project.enqueued_at).max(0) as u64);
    format!(
        "{:>5}  {:<13} p{:<3} {:>6}  {}{}",
        project.id,
        project.status.to_string(),
        project.priority,
        age,
        project.spec_path,
        project
            .project_path
            .as_deref()
            .map(|p| format!("  ({p})"))
            .unwrap_or_default(),
    )
}

/// Multi-line detail block for `gaffer status`.
pub fn project_detail(project: &Project, now: i64) -> String {
    let mut out = String::new();
    let mut line = |key: &str, value: String| {
        out.push_str(&format!("{key:<20} {value}\n"));
    };

    line("id", project.id.to_string());
    line("status", project.status.to_string());
    line("spec", project.spec_path.clone());
    if let Some(path) = &project.project_path {
        line("project", path.clone());
    }
    if let Some(batch) = &project.batch_id {
        line("batch", batch.clone());
    }
    line("priority", project.priority.to_string());
    if let Some(session) = &project.session_name {
        line("session", session.clone());
    }
    if let Some(pid) = project.main_pid {
        line("pid", pid.to_string());
    }
    if let Some(runtime) = project.runtime(now) {
        line("runtime", format_elapsed(runtime.max(0) as u64));
    }
    if let Some(age) = project.heartbeat_age(now) {
        line("heartbeat age", format_elapsed(age.max(0) as u64));
    }
    line("retries", project.retry_count.to_string());
    line("extensions", project.timeout_extensions.to_string());
    if let Some(error) = &project.error_message {
        line("error", error.clone());
    }
    out
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
