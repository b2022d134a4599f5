// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project admission and check-in scheduling.
//!
//! Admission is strictly serial: one project holds the slot until its
//! row goes terminal. On admission the queue daemon launches the
//! configured setup subprocess under the process manager; the setup
//! layer creates the agent session named by the `{session}`
//! placeholder.

use crate::bus::{MessageBus, CREDIT_EXHAUSTED_ERROR};
use crate::error::EngineError;
use crate::events::EventBus;
use gaffer_adapters::{ProcessEvent, ProcessManager, SessionController, SpawnSpec};
use gaffer_core::{AgentStatus, BusEvent, CheckinTask, Clock, FifoScope, Project, Role};
use gaffer_store::Store;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Per-project wall-clock deadline (`MAX_PROCESS_RUNTIME_SEC`)
    pub max_runtime_secs: u64,
    /// Setup command template; `{spec}`, `{project}`, `{id}`, and
    /// `{session}` are substituted
    pub setup_command: Vec<String>,
    /// Cap on the check-in back-off delay for credit-exhausted agents
    pub max_backoff_secs: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_runtime_secs: 1800,
            setup_command: Vec::new(),
            max_backoff_secs: 4 * 3600,
        }
    }
}

/// Session name convention for a project's crew.
pub fn session_name_for(project: &Project) -> String {
    format!("gaffer-{}", project.id)
}

/// Admits projects and fires check-in tasks.
#[derive(Clone)]
pub struct QueueScheduler<S: SessionController, C: Clock> {
    store: Store,
    manager: ProcessManager<S>,
    clock: C,
    events: EventBus,
    config: SchedulerConfig,
}

impl<S: SessionController, C: Clock> QueueScheduler<S, C> {
    pub fn new(
        store: Store,
        manager: ProcessManager<S>,
        clock: C,
        events: EventBus,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            store,
            manager,
            clock,
            events,
            config,
        }
    }

    /// One admission attempt: claim the next queued project and launch
    /// its setup subprocess. Returns the admitted project, if any.
    pub fn try_admit(
        &self,
        process_events: &mpsc::Sender<ProcessEvent>,
    ) -> Result<Option<Project>, EngineError> {
        let now = self.clock.epoch_secs();
        let Some(project) = self.store.claim_next_project(now)? else {
            return Ok(None);
        };

        let session = session_name_for(&project);
        let argv = render_command(&self.config.setup_command, &project, &session);
        if argv.is_empty() {
            warn!(project_id = project.id, "no setup command configured, project idles");
            self.store
                .record_supervision(project.id, Some(&session), None)?;
            return Ok(Some(project));
        }

        let cwd = project
            .project_path
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().display().to_string());
        let mut spec = SpawnSpec::new(
            project.id,
            argv,
            cwd,
            Duration::from_secs(self.config.max_runtime_secs),
        );
        spec.companion_session = Some(session.clone());
        spec.env.push(("GAFFER_PROJECT_ID".to_string(), project.id.to_string()));
        spec.env.push(("GAFFER_SESSION".to_string(), session.clone()));

        let handle = self.manager.spawn(spec, process_events.clone())?;
        self.store
            .record_supervision(project.id, Some(&session), Some(handle.pid()))?;

        info!(project_id = project.id, session, pid = handle.pid(), "project admitted");
        self.events.publish(BusEvent::StatusUpdate {
            project_id: project.id,
            status: project.status.to_string(),
            detail: Some("admitted".to_string()),
        });

        Ok(Some(self.store.get_project(project.id)?))
    }

    /// One scheduler tick: fire all due check-in tasks.
    ///
    /// Credit-exhausted agents are rescheduled with exponential
    /// back-off; orchestrator-role completion reports are dropped (the
    /// anti-self-scheduling guard); a task whose last run is older than
    /// twice its interval logs the miss and catches up exactly once.
    pub fn fire_due_checkins(
        &self,
        bus: &MessageBus<C>,
        roles: &[Role],
    ) -> Result<usize, EngineError> {
        let now = self.clock.epoch_secs();
        let mut fired = 0;

        for task in self.store.due_checkins(now)? {
            if self.is_self_scheduling(&task, roles) {
                warn!(task_id = task.id, agent = %task.agent, "dropping self-scheduling completion report");
                self.store.delete_checkin(task.id)?;
                continue;
            }

            if self.agent_credit_exhausted(&task)? {
                let next = now + backoff_delay(&task, now, self.config.max_backoff_secs);
                info!(task_id = task.id, agent = %task.agent, next, "agent out of credit, backing off");
                self.store.reschedule_checkin(task.id, next)?;
                continue;
            }

            if task.missed_fire(now) {
                warn!(
                    task_id = task.id,
                    agent = %task.agent,
                    last_run_at = ?task.last_run_at,
                    "missed check-in fire, catching up once"
                );
            }

            match bus.send(&task.agent, task.note.as_bytes(), 0, None, FifoScope::Agent, None) {
                Ok(_) => {
                    self.store.mark_checkin_fired(task.id, now)?;
                    self.events.publish(BusEvent::TaskCompleted {
                        task_id: task.id,
                        agent: task.agent.clone(),
                    });
                    fired += 1;
                }
                Err(e) => {
                    // Leave the task due; the next tick retries
                    warn!(task_id = task.id, error = %e, "check-in send failed, leaving task due");
                }
            }
        }

        Ok(fired)
    }

    /// The anti-self-scheduling guard: completion-report tasks aimed at
    /// an orchestrator-role window would schedule their own follow-ups
    /// forever.
    fn is_self_scheduling(&self, task: &CheckinTask, roles: &[Role]) -> bool {
        if !task.is_completion_report() {
            return false;
        }
        Role::find(roles, task.agent.window())
            .map(|role| role.orchestrates)
            .unwrap_or(false)
    }

    fn agent_credit_exhausted(&self, task: &CheckinTask) -> Result<bool, EngineError> {
        let record = self.store.get_agent(&task.agent)?;
        Ok(record
            .map(|r| {
                r.status == AgentStatus::Error
                    && r.last_error.as_deref() == Some(CREDIT_EXHAUSTED_ERROR)
            })
            .unwrap_or(false))
    }
}

/// Exponential back-off derived from the task's current gap: each
/// reschedule doubles the distance, clamped to `[interval, max]`.
fn backoff_delay(task: &CheckinTask, now: i64, max_secs: i64) -> i64 {
    let last = task.last_run_at.unwrap_or(now - task.interval_secs);
    let gap = (now - last).max(task.interval_secs);
    (gap * 2).clamp(task.interval_secs, max_secs)
}

/// Substitute the placeholders of the setup command template.
fn render_command(template: &[String], project: &Project, session: &str) -> Vec<String> {
    template
        .iter()
        .map(|arg| {
            arg.replace("{spec}", &project.spec_path)
                .replace("{project}", project.project_path.as_deref().unwrap_or(""))
                .replace("{id}", &project.id.to_string())
                .replace("{session}", session)
        })
        .collect()
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
