//! Shared helpers for the CLI specs.

use assert_cmd::Command;
use tempfile::TempDir;

/// A CLI invocation rooted at its own throwaway state dir.
pub struct Workspace {
    pub state: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            state: tempfile::tempdir().expect("tempdir"),
        }
    }

    /// `gaffer` command bound to this workspace's state dir.
    pub fn gaffer(&self) -> Command {
        let mut cmd = Command::cargo_bin("gaffer").expect("gaffer binary");
        cmd.env("GAFFER_STATE_DIR", self.state.path());
        cmd.env_remove("GAFFER_SETUP_CMD");
        cmd.env_remove("GAFFER_RULES_DOC");
        cmd
    }

    /// Enqueue a spec and return the printed queue id.
    pub fn enqueue(&self, spec: &str) -> String {
        let output = self
            .gaffer()
            .args(["enqueue", spec])
            .output()
            .expect("run enqueue");
        assert!(output.status.success(), "enqueue failed: {output:?}");
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }
}
