// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration: state-dir layout and derived component
//! configs. One state dir serves all projects for a user.

use crate::{env, DaemonError};
use gaffer_core::Role;
use gaffer_engine::{BusConfig, LifecycleConfig, SchedulerConfig};
use std::path::PathBuf;
use tracing::warn;

/// Paths and knobs shared by both daemons and the CLI.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Root state directory (e.g. ~/.local/state/gaffer)
    pub state_dir: PathBuf,
    /// SQLite database
    pub db_path: PathBuf,
    /// Singleton lock files
    pub locks_dir: PathBuf,
    /// Daemon log files
    pub logs_dir: PathBuf,
    /// Daily event logs
    pub events_dir: PathBuf,
    /// Per-project registry (session-state files, completion markers)
    pub registry_dir: PathBuf,
    /// The compliance rules document
    pub rules_doc_path: PathBuf,
    /// Extra role rows merged over the builtins
    pub roles_path: PathBuf,
    /// Project-setup command template (`GAFFER_SETUP_CMD`,
    /// whitespace-split; `{spec}` `{project}` `{id}` `{session}`)
    pub setup_command: Vec<String>,
}

impl DaemonConfig {
    /// Resolve the state dir from `GAFFER_STATE_DIR`, then
    /// `$XDG_STATE_HOME/gaffer`, then `~/.local/state/gaffer`.
    pub fn load() -> Result<Self, DaemonError> {
        let state_dir = match std::env::var_os("GAFFER_STATE_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::state_dir()
                .or_else(|| dirs::home_dir().map(|h| h.join(".local/state")))
                .ok_or(DaemonError::NoStateDir)?
                .join("gaffer"),
        };
        Ok(Self::at(state_dir))
    }

    /// Layout rooted at an explicit state dir.
    pub fn at(state_dir: PathBuf) -> Self {
        let rules_doc_path = match std::env::var_os("GAFFER_RULES_DOC") {
            Some(path) => PathBuf::from(path),
            None => state_dir.join("rules.md"),
        };
        let setup_command = std::env::var("GAFFER_SETUP_CMD")
            .map(|cmd| cmd.split_whitespace().map(String::from).collect())
            .unwrap_or_default();

        Self {
            db_path: state_dir.join("gaffer.db"),
            locks_dir: state_dir.join("locks"),
            logs_dir: state_dir.join("logs"),
            events_dir: state_dir.join("logs").join("events"),
            registry_dir: state_dir.join("registry"),
            roles_path: state_dir.join("roles.json"),
            rules_doc_path,
            setup_command,
            state_dir,
        }
    }

    /// Log file for one daemon role.
    pub fn log_path(&self, role: &str) -> PathBuf {
        self.logs_dir.join(format!("gafferd-{role}.log"))
    }

    /// Role table: builtins plus whatever `roles.json` adds.
    pub fn roles(&self) -> Vec<Role> {
        let extras = std::fs::read_to_string(&self.roles_path)
            .ok()
            .and_then(|raw| match serde_json::from_str::<Vec<Role>>(&raw) {
                Ok(roles) => Some(roles),
                Err(e) => {
                    warn!(path = %self.roles_path.display(), error = %e, "roles.json unreadable, using builtins");
                    None
                }
            })
            .unwrap_or_default();
        Role::with_extras(extras)
    }

    /// Message-bus config from the environment.
    pub fn bus_config(&self) -> BusConfig {
        BusConfig {
            rules_doc_path: self.rules_doc_path.clone(),
            fast_lane_enabled: !env::fast_lane_disabled(),
            ..BusConfig::default()
        }
    }

    /// Lifecycle config from the environment.
    pub fn lifecycle_config(&self) -> LifecycleConfig {
        LifecycleConfig {
            heartbeat_timeout_secs: env::heartbeat_timeout_secs(),
            max_timeout_extensions: env::max_timeout_extensions(),
            phantom_grace_secs: env::phantom_grace_secs(),
            registry_dir: self.registry_dir.clone(),
            ..LifecycleConfig::default()
        }
    }

    /// Scheduler config from the environment.
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            max_runtime_secs: env::max_process_runtime_secs(),
            setup_command: self.setup_command.clone(),
            ..SchedulerConfig::default()
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
