// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervised subprocess manager.
//!
//! Spawns long-running children (project setup, daemons) with a
//! wall-clock deadline, a graceful-stop signal, and a hard-kill grace
//! window. A monitor task watches the child, its optional companion
//! terminal session, and its resource usage, and reports exactly one
//! terminal [`ProcessOutcome`] per child on the registered channel.

use crate::session::SessionController;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How often the monitor inspects the child.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Default secondary grace window between graceful stop and hard kill.
pub const DEFAULT_GRACE: Duration = Duration::from_secs(30);

/// Errors from spawning.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("empty argv")]
    EmptyArgv,
    #[error("spawn failed: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("child has no pid")]
    NoPid,
}

/// Classified terminal outcome of a supervised child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Exited cleanly (including a clean exit inside the grace window)
    Completed { exit_code: i32 },
    /// Deadline or resource cap reached; graceful signal and grace
    /// window did not produce a clean exit
    TimedOut,
    /// Process alive but its companion terminal session is gone
    Zombie,
    /// Unclean exit without our intervention
    Crashed { reason: String },
}

/// Terminal status report for one supervised child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEvent {
    /// Caller-assigned tag (the project id)
    pub tag: i64,
    pub pid: i32,
    pub outcome: ProcessOutcome,
}

/// Optional resource caps; breach escalates to the timeout path.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceCaps {
    pub max_rss_bytes: Option<u64>,
    pub max_open_files: Option<u64>,
}

/// Everything needed to spawn and supervise one child.
#[derive(Debug, Clone)]
pub struct SpawnSpec {
    /// Caller-assigned tag echoed in the status event
    pub tag: i64,
    pub argv: Vec<String>,
    pub env: Vec<(String, String)>,
    pub cwd: PathBuf,
    /// Wall-clock deadline before the graceful stop is signalled
    pub deadline: Duration,
    /// Window between graceful stop and hard kill
    pub grace: Duration,
    pub graceful_signal: Signal,
    pub hard_signal: Signal,
    /// Terminal session whose death marks the child a zombie
    pub companion_session: Option<String>,
    pub caps: ResourceCaps,
}

impl SpawnSpec {
    pub fn new(tag: i64, argv: Vec<String>, cwd: impl Into<PathBuf>, deadline: Duration) -> Self {
        Self {
            tag,
            argv,
            env: Vec::new(),
            cwd: cwd.into(),
            deadline,
            grace: DEFAULT_GRACE,
            graceful_signal: Signal::SIGTERM,
            hard_signal: Signal::SIGKILL,
            companion_session: None,
            caps: ResourceCaps::default(),
        }
    }
}

/// Handle to a supervised child.
pub struct ProcessHandle {
    pid: i32,
    cancel: CancellationToken,
}

impl ProcessHandle {
    pub fn pid(&self) -> i32 {
        self.pid
    }

    /// Abandon supervision and kill the child. No status event follows
    /// beyond the cancellation report.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

/// Spawns children and supervises them on background tasks.
#[derive(Clone)]
pub struct ProcessManager<S: SessionController> {
    sessions: S,
}

impl<S: SessionController> ProcessManager<S> {
    pub fn new(sessions: S) -> Self {
        Self { sessions }
    }

    /// Spawn and supervise one child. Its terminal outcome arrives
    /// exactly once on `events`.
    pub fn spawn(
        &self,
        spec: SpawnSpec,
        events: mpsc::Sender<ProcessEvent>,
    ) -> Result<ProcessHandle, ProcessError> {
        let program = spec.argv.first().ok_or(ProcessError::EmptyArgv)?;

        let mut cmd = Command::new(program);
        cmd.args(&spec.argv[1..])
            .current_dir(&spec.cwd)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null());
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }

        let child = cmd.spawn()?;
        let pid = child.id().ok_or(ProcessError::NoPid)? as i32;
        let cancel = CancellationToken::new();

        info!(tag = spec.tag, pid, argv = ?spec.argv, "spawned supervised child");
        tokio::spawn(monitor(
            child,
            pid,
            spec,
            self.sessions.clone(),
            events,
            cancel.clone(),
        ));

        Ok(ProcessHandle { pid, cancel })
    }
}

async fn monitor<S: SessionController>(
    mut child: Child,
    pid: i32,
    spec: SpawnSpec,
    sessions: S,
    events: mpsc::Sender<ProcessEvent>,
    cancel: CancellationToken,
) {
    let started = Instant::now();
    let mut interval = tokio::time::interval(POLL_INTERVAL);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut soft_sent_at: Option<Instant> = None;
    let mut hard_sent = false;
    // The setup child creates its own session; zombie detection only
    // arms once the session has been seen alive.
    let mut session_seen = false;

    // `None` breaks mean cancellation; the child is killed after the
    // select futures (which borrow it) are gone.
    let outcome = loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                break None;
            }

            status = child.wait() => {
                break Some(classify_exit(status, soft_sent_at.is_some() || hard_sent));
            }

            _ = interval.tick() => {
                if let Some(session) = &spec.companion_session {
                    match sessions.session_alive(session).await {
                        Ok(true) => session_seen = true,
                        Ok(false) if session_seen => {
                            warn!(tag = spec.tag, pid, session, "companion session gone, child is a zombie");
                            break Some(ProcessOutcome::Zombie);
                        }
                        _ => {}
                    }
                }

                if soft_sent_at.is_none() {
                    if let Some(reason) = caps_breached(pid, &spec.caps) {
                        warn!(tag = spec.tag, pid, reason, "resource cap breached, escalating to timeout");
                        send_signal(pid, spec.graceful_signal);
                        soft_sent_at = Some(Instant::now());
                    } else if started.elapsed() >= spec.deadline {
                        info!(tag = spec.tag, pid, "deadline reached, sending graceful stop");
                        send_signal(pid, spec.graceful_signal);
                        soft_sent_at = Some(Instant::now());
                    }
                } else if !hard_sent {
                    if let Some(sent_at) = soft_sent_at {
                        if sent_at.elapsed() >= spec.grace {
                            warn!(tag = spec.tag, pid, "grace expired, sending hard kill");
                            send_signal(pid, spec.hard_signal);
                            hard_sent = true;
                        }
                    }
                }
            }
        }
    };

    let outcome = match outcome {
        Some(outcome) => outcome,
        None => {
            let _ = child.start_kill();
            let _ = child.wait().await;
            ProcessOutcome::Crashed {
                reason: "supervision cancelled".to_string(),
            }
        }
    };

    info!(tag = spec.tag, pid, outcome = ?outcome, "supervised child terminal");
    let _ = events
        .send(ProcessEvent {
            tag: spec.tag,
            pid,
            outcome,
        })
        .await;
}

/// Classify a natural exit. A clean exit counts as completed even
/// inside the grace window; an unclean one after our signal is a
/// timeout, otherwise a crash.
fn classify_exit(
    status: std::io::Result<std::process::ExitStatus>,
    we_signalled: bool,
) -> ProcessOutcome {
    match status {
        Err(e) => ProcessOutcome::Crashed {
            reason: format!("wait failed: {e}"),
        },
        Ok(status) => match status.code() {
            Some(0) => ProcessOutcome::Completed { exit_code: 0 },
            Some(_) if we_signalled => ProcessOutcome::TimedOut,
            Some(code) => ProcessOutcome::Crashed {
                reason: format!("exit code {code}"),
            },
            // Killed by a signal
            None if we_signalled => ProcessOutcome::TimedOut,
            None => ProcessOutcome::Crashed {
                reason: "killed by signal".to_string(),
            },
        },
    }
}

fn send_signal(pid: i32, signal: Signal) {
    if let Err(e) = kill(Pid::from_raw(pid), signal) {
        warn!(pid, %signal, error = %e, "failed to signal child");
    }
}

/// Probe `/proc` for cap breaches. Non-Linux hosts never breach.
#[cfg(target_os = "linux")]
fn caps_breached(pid: i32, caps: &ResourceCaps) -> Option<String> {
    if let Some(max_rss) = caps.max_rss_bytes {
        let status = std::fs::read_to_string(format!("/proc/{pid}/status")).ok()?;
        for line in status.lines() {
            if let Some(rest) = line.strip_prefix("VmRSS:") {
                let kb: u64 = rest
                    .trim()
                    .trim_end_matches("kB")
                    .trim()
                    .parse()
                    .unwrap_or(0);
                if kb * 1024 > max_rss {
                    return Some(format!("rss {} kB over cap", kb));
                }
            }
        }
    }
    if let Some(max_fds) = caps.max_open_files {
        if let Ok(entries) = std::fs::read_dir(format!("/proc/{pid}/fd")) {
            let count = entries.count() as u64;
            if count > max_fds {
                return Some(format!("{count} open files over cap"));
            }
        }
    }
    None
}

#[cfg(not(target_os = "linux"))]
fn caps_breached(_pid: i32, _caps: &ResourceCaps) -> Option<String> {
    None
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
