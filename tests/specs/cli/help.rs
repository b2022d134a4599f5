//! Help and version surface.

use crate::prelude::Workspace;

#[test]
fn help_lists_the_normative_commands() {
    let ws = Workspace::new();
    let output = ws.gaffer().arg("--help").output().unwrap();
    assert!(output.status.success());

    let help = String::from_utf8_lossy(&output.stdout);
    for command in ["enqueue", "list", "status", "cancel", "scheduler", "queue", "recovery", "pull"] {
        assert!(help.contains(command), "help is missing {command:?}");
    }
}

#[test]
fn version_prints_and_exits_zero() {
    let ws = Workspace::new();
    ws.gaffer().arg("--version").assert().success();
}

#[test]
fn recovery_help_lists_the_tools() {
    let ws = Workspace::new();
    let output = ws.gaffer().args(["recovery", "--help"]).output().unwrap();
    let help = String::from_utf8_lossy(&output.stdout);
    for tool in ["list-stuck", "reset", "kill-zombie", "diagnostics"] {
        assert!(help.contains(tool), "recovery help is missing {tool:?}");
    }
}
