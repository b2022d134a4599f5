// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project session lifecycle: reboot recovery, completion detection,
//! phantom/zombie sweeps, credit pauses, and the auto-restart policy.

use crate::bus::MessageBus;
use crate::error::EngineError;
use crate::events::EventBus;
use gaffer_adapters::lock::pid_alive;
use gaffer_adapters::{ProcessEvent, ProcessOutcome, SessionController};
use gaffer_core::{AgentId, BusEvent, Clock, FifoScope, Project, ProjectId, ProjectStatus};
use gaffer_store::{Store, StoreError, TransitionUpdate};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Reason recorded when reboot recovery finds no trace of a session.
pub const REBOOT_REASON: &str = "terminated during reboot";

/// Lifecycle tuning knobs, mostly fed from the environment.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Heartbeats older than this are stale
    pub heartbeat_timeout_secs: i64,
    /// Stale-heartbeat extensions granted before timing out
    pub max_timeout_extensions: u32,
    /// Projects younger than this are exempt from the sweep (their
    /// session may not exist yet)
    pub phantom_grace_secs: i64,
    /// Trailing window for the auto-restart budget
    pub restart_window_secs: i64,
    /// Restarts allowed within the window before escalating
    pub max_restarts_per_window: u32,
    /// Per-project registry directory (session-state files, markers)
    pub registry_dir: PathBuf,
    /// Pane substrings that signal completion
    pub completion_patterns: Vec<String>,
    /// Reboot recovery only adopts sessions younger than this
    pub session_max_age_secs: i64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            heartbeat_timeout_secs: 600,
            max_timeout_extensions: 3,
            phantom_grace_secs: 900,
            restart_window_secs: 3600,
            max_restarts_per_window: 3,
            registry_dir: PathBuf::new(),
            completion_patterns: vec![
                "ALL PHASES COMPLETE".to_string(),
                "PROJECT COMPLETE".to_string(),
            ],
            session_max_age_secs: 8 * 3600,
        }
    }
}

/// Agent-maintained session state, written into the registry dir.
/// Readers tolerate unknown fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionStateFile {
    #[serde(default)]
    pub phases: std::collections::HashMap<String, String>,
    #[serde(default)]
    pub completed: bool,
}

impl SessionStateFile {
    /// All tracked phases terminal (and at least one tracked).
    pub fn all_phases_terminal(&self) -> bool {
        !self.phases.is_empty()
            && self
                .phases
                .values()
                .all(|s| matches!(s.as_str(), "completed" | "failed" | "skipped"))
    }

    pub fn indicates_completion(&self) -> bool {
        self.completed || self.all_phases_terminal()
    }
}

/// Drives the project state machine from what the store, the sessions,
/// and the process manager report.
#[derive(Clone)]
pub struct LifecycleManager<S: SessionController, C: Clock> {
    store: Store,
    sessions: S,
    clock: C,
    events: EventBus,
    bus: MessageBus<C>,
    config: LifecycleConfig,
}

impl<S: SessionController, C: Clock> LifecycleManager<S, C> {
    pub fn new(
        store: Store,
        sessions: S,
        clock: C,
        events: EventBus,
        bus: MessageBus<C>,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            store,
            sessions,
            clock,
            events,
            bus,
            config,
        }
    }

    /// Registry directory for one project.
    pub fn registry_dir(&self, id: ProjectId) -> PathBuf {
        self.config.registry_dir.join(id.to_string())
    }

    fn marker_path(&self, id: ProjectId) -> PathBuf {
        self.registry_dir(id).join("COMPLETED")
    }

    fn state_file_path(&self, id: ProjectId) -> PathBuf {
        self.registry_dir(id).join("state.json")
    }

    fn read_state_file(&self, id: ProjectId) -> Option<SessionStateFile> {
        let raw = std::fs::read_to_string(self.state_file_path(id)).ok()?;
        serde_json::from_str(&raw).ok()
    }

    /// Reconcile non-terminal rows after a daemon or host restart.
    pub async fn recover_on_reboot(&self) -> Result<(), EngineError> {
        let now = self.clock.epoch_secs();

        for project in self.store.active_projects()? {
            match project.status {
                ProjectStatus::Processing
                | ProjectStatus::TimingOut
                | ProjectStatus::CreditPaused => {
                    self.recover_project(&project, now).await?;
                }
                _ => {}
            }
        }

        // Invariant repair after whatever the recovery decided
        for healed in self.store.heal_admission()? {
            self.events.publish(BusEvent::StatusUpdate {
                project_id: healed,
                status: ProjectStatus::Queued.to_string(),
                detail: Some("admission self-heal".to_string()),
            });
        }
        Ok(())
    }

    async fn recover_project(&self, project: &Project, now: i64) -> Result<(), EngineError> {
        // 1. The recorded session may have survived the reboot
        if let Some(name) = &project.session_name {
            if self.sessions.session_alive(name).await? {
                info!(project_id = project.id, session = name, "session survived reboot");
                return Ok(());
            }
        }

        // 2. Pattern-match live sessions young enough to be ours
        if let Some(found) = self.find_session_by_pattern(project, now).await? {
            info!(project_id = project.id, session = %found, "adopted session by pattern match");
            self.store
                .record_supervision(project.id, Some(&found), None)?;
            return Ok(());
        }

        // 3. No session left: the state file decides completed vs failed
        if self.detect_completion(project).await? {
            self.complete(project.id)?;
        } else {
            self.fail(project.id, REBOOT_REASON)?;
        }
        Ok(())
    }

    async fn find_session_by_pattern(
        &self,
        project: &Project,
        now: i64,
    ) -> Result<Option<String>, EngineError> {
        let needle = session_pattern(project);
        for name in self.sessions.list_sessions().await? {
            if !name.contains(&needle) {
                continue;
            }
            let created = self.sessions.session_created_at(&name).await?.unwrap_or(0);
            if now.saturating_sub(created) < self.config.session_max_age_secs {
                return Ok(Some(name));
            }
        }
        Ok(None)
    }

    /// Completion is detected by any one of: the marker file, the
    /// session-state file, or a completion pattern in the pane.
    pub async fn detect_completion(&self, project: &Project) -> Result<bool, EngineError> {
        if self.marker_path(project.id).exists() {
            return Ok(true);
        }

        if let Some(state) = self.read_state_file(project.id) {
            if state.indicates_completion() {
                return Ok(true);
            }
        }

        if let Some(session) = &project.session_name {
            if self.sessions.session_alive(session).await? {
                if let Some((index, _)) = self.sessions.list_windows(session).await?.first() {
                    let target = AgentId::from_parts(session, &index.to_string());
                    let pane = self.sessions.capture_pane(&target, 50).await?;
                    if self
                        .config
                        .completion_patterns
                        .iter()
                        .any(|p| pane.contains(p))
                    {
                        return Ok(true);
                    }
                }
            }
        }

        Ok(false)
    }

    /// Periodic phantom/zombie sweep over `processing` rows.
    pub async fn sweep(&self) -> Result<(), EngineError> {
        let now = self.clock.epoch_secs();

        for project in self.store.list_projects(Some(ProjectStatus::Processing))? {
            // Completion first: a finished project must not be timed out
            if self.detect_completion(&project).await? {
                self.complete(project.id)?;
                continue;
            }

            // Young projects get a grace period while setup is still
            // creating their session
            if project.runtime(now).unwrap_or(0) < self.config.phantom_grace_secs {
                continue;
            }

            // (a) supervised process must be alive
            if let Some(pid) = project.main_pid {
                if !pid_alive(pid) {
                    warn!(project_id = project.id, pid, "supervised process gone");
                    self.transition_with_event(
                        project.id,
                        ProjectStatus::TimingOut,
                        TransitionUpdate::error("supervised process disappeared"),
                    )?;
                    continue;
                }
            }

            // (b) terminal session must be alive
            if let Some(session) = &project.session_name {
                if !self.sessions.session_alive(session).await? {
                    warn!(project_id = project.id, session, "session gone, marking zombie");
                    self.transition_with_event(
                        project.id,
                        ProjectStatus::Zombie,
                        TransitionUpdate::default(),
                    )?;
                    continue;
                }
            }

            // (c) heartbeat must be fresh, with bounded extensions
            if let Some(age) = project.heartbeat_age(now) {
                if age > self.config.heartbeat_timeout_secs {
                    if project.timeout_extensions < self.config.max_timeout_extensions {
                        let granted = self.store.extend_timeout(project.id, now)?;
                        warn!(
                            project_id = project.id,
                            age, granted, "stale heartbeat, granting extension"
                        );
                    } else {
                        warn!(project_id = project.id, age, "extensions exhausted, timing out");
                        self.transition_with_event(
                            project.id,
                            ProjectStatus::TimingOut,
                            TransitionUpdate::error("heartbeat lost"),
                        )?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Terminal status callback from the process manager.
    ///
    /// The sweep may have moved the row first (e.g. completion detected
    /// while the callback was in flight); a transition refused because
    /// the row is already terminal is not an error here.
    pub async fn handle_process_event(&self, event: ProcessEvent) -> Result<(), EngineError> {
        let id = event.tag;
        let result = match event.outcome {
            ProcessOutcome::Completed { exit_code } => {
                info!(project_id = id, exit_code, "setup process completed");
                self.complete(id)
            }
            ProcessOutcome::TimedOut => {
                // The manager already ran the soft-stop grace; record
                // both legs of the transition.
                let _ = self.transition_with_event(
                    id,
                    ProjectStatus::TimingOut,
                    TransitionUpdate::default(),
                );
                self.fail(id, "wall-clock deadline exceeded")
            }
            ProcessOutcome::Zombie => {
                self.transition_with_event(id, ProjectStatus::Zombie, TransitionUpdate::default())
            }
            ProcessOutcome::Crashed { reason } => {
                self.fail(id, &format!("setup crashed: {reason}"))
            }
        };

        match result {
            Err(EngineError::Store(StoreError::IllegalTransition { from, to }))
                if from.is_terminal() =>
            {
                info!(project_id = id, %from, %to, "row already terminal, callback ignored");
                Ok(())
            }
            other => other,
        }
    }

    /// Credit exhaustion reported for a project's agent.
    pub fn pause_for_credit(&self, id: ProjectId, agent: &AgentId) -> Result<(), EngineError> {
        self.bus.credit_exhausted(agent)?;
        self.transition_with_event(id, ProjectStatus::CreditPaused, TransitionUpdate::default())?;
        self.events.publish(BusEvent::CreditExhausted {
            agent: agent.clone(),
        });
        Ok(())
    }

    /// External credit-return signal.
    pub fn resume_from_credit(&self, id: ProjectId) -> Result<(), EngineError> {
        self.transition_with_event(id, ProjectStatus::Processing, TransitionUpdate::default())?;
        Ok(())
    }

    /// Auto-restart policy for a failing agent: under the budget, kill
    /// and recreate its window and rebrief from the snapshot; over the
    /// budget, escalate to the orchestrator and stop restarting.
    pub async fn handle_agent_error(
        &self,
        agent: &AgentId,
        error: &str,
    ) -> Result<bool, EngineError> {
        let now = self.clock.epoch_secs();
        self.bus.error_hook(agent, error)?;

        let recent = self
            .store
            .restarts_in_window(agent, self.config.restart_window_secs, now)?;
        if recent >= self.config.max_restarts_per_window {
            warn!(%agent, recent, "restart budget exhausted, escalating");
            let orchestrator = AgentId::from_parts(agent.session(), "orchestrator");
            self.bus.send(
                &orchestrator,
                format!("agent {agent} keeps failing ({error}); manual attention needed")
                    .as_bytes(),
                60,
                None,
                FifoScope::Agent,
                None,
            )?;
            // Off the bus so the error scan does not re-escalate
            self.store
                .set_agent_status(agent, gaffer_core::AgentStatus::Offline, now)?;
            return Ok(false);
        }

        let window = agent.window().to_string();
        if let Err(e) = self.sessions.kill_window(agent).await {
            warn!(%agent, error = %e, "window kill failed before restart");
        }
        self.sessions.create_window(agent.session(), &window).await?;
        self.bus.rebrief(agent)?;
        let total = self
            .store
            .record_restart(agent, self.config.restart_window_secs, now)?;
        self.store
            .set_agent_status(agent, gaffer_core::AgentStatus::Active, now)?;
        info!(%agent, total, "agent window restarted and rebriefed");
        Ok(true)
    }

    /// Run the auto-restart path for every agent sitting in `error`
    /// (credit exhaustion is the scheduler's concern, not a restart).
    pub async fn restart_errored_agents(&self) -> Result<usize, EngineError> {
        let mut restarted = 0;
        for record in self.store.list_agents()? {
            if record.status != gaffer_core::AgentStatus::Error {
                continue;
            }
            if record.last_error.as_deref() == Some(crate::bus::CREDIT_EXHAUSTED_ERROR) {
                continue;
            }
            let error = record.last_error.clone().unwrap_or_else(|| "unknown".to_string());
            match self.handle_agent_error(&record.agent_session, &error).await {
                Ok(true) => restarted += 1,
                Ok(false) => {}
                // One broken agent must not block the rest of the scan
                Err(e) => warn!(agent = %record.agent_session, error = %e, "agent restart failed"),
            }
        }
        Ok(restarted)
    }

    /// Reap a zombie: kill the leftover process and session, mark the
    /// row failed, and free the admission slot.
    pub async fn kill_zombie(&self, id: ProjectId) -> Result<(), EngineError> {
        let project = self.store.get_project(id)?;
        if project.status != ProjectStatus::Zombie {
            return Err(EngineError::Store(StoreError::IllegalTransition {
                from: project.status,
                to: ProjectStatus::Failed,
            }));
        }

        if let Some(pid) = project.main_pid {
            if pid_alive(pid) {
                let _ = nix::sys::signal::kill(
                    nix::unistd::Pid::from_raw(pid),
                    nix::sys::signal::Signal::SIGKILL,
                );
            }
        }
        if let Some(session) = &project.session_name {
            self.sessions.kill_session(session).await?;
        }

        self.fail(id, "zombie reaped")?;
        Ok(())
    }

    /// Graceful cancel: soft-kill the supervised process, kill the
    /// session, expire the project's agents, and fail the row.
    pub async fn cancel(&self, id: ProjectId) -> Result<(), EngineError> {
        let project = self.store.get_project(id)?;

        if let Some(pid) = project.main_pid {
            if pid_alive(pid) {
                let _ = nix::sys::signal::kill(
                    nix::unistd::Pid::from_raw(pid),
                    nix::sys::signal::Signal::SIGTERM,
                );
                tokio::time::sleep(std::time::Duration::from_secs(2)).await;
                if pid_alive(pid) {
                    let _ = nix::sys::signal::kill(
                        nix::unistd::Pid::from_raw(pid),
                        nix::sys::signal::Signal::SIGKILL,
                    );
                }
            }
        }

        if let Some(session) = &project.session_name {
            self.sessions.kill_session(session).await?;
        }

        self.fail(id, "cancelled by operator")?;
        Ok(())
    }

    fn complete(&self, id: ProjectId) -> Result<(), EngineError> {
        let project =
            self.store
                .transition_project(id, ProjectStatus::Completed, TransitionUpdate::default(), self.clock.epoch_secs())?;
        self.events.publish(BusEvent::ProjectCompleted {
            project_id: id,
            session_name: project.session_name,
        });
        Ok(())
    }

    fn fail(&self, id: ProjectId, reason: &str) -> Result<(), EngineError> {
        self.store.transition_project(
            id,
            ProjectStatus::Failed,
            TransitionUpdate::error(reason),
            self.clock.epoch_secs(),
        )?;
        self.events.publish(BusEvent::ProjectFailed {
            project_id: id,
            reason: reason.to_string(),
        });
        Ok(())
    }

    fn transition_with_event(
        &self,
        id: ProjectId,
        to: ProjectStatus,
        update: TransitionUpdate,
    ) -> Result<(), EngineError> {
        self.store
            .transition_project(id, to, update, self.clock.epoch_secs())?;
        self.events.publish(BusEvent::StatusUpdate {
            project_id: id,
            status: to.to_string(),
            detail: None,
        });
        Ok(())
    }
}

/// Session-name fragment used by pattern recovery: the spec file stem.
fn session_pattern(project: &Project) -> String {
    Path::new(&project.spec_path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("proj{}", project.id))
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
