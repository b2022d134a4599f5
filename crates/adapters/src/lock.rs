// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Singleton lock guard for daemon roles.
//!
//! One lock file per daemon role under the locks directory, held with
//! an exclusive `fs2` file lock and carrying pid + role + cwd metadata.
//! The file lock dies with its process, so a failed acquire means a
//! live holder; the pid metadata backs the stale checks for
//! filesystems where range locks are unreliable, and the init-restart
//! path trusts the supervisor over the previous owner.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Poll cadence while waiting out a predecessor during an init restart.
const RESTART_POLL: Duration = Duration::from_millis(500);

/// Bounded grace for the predecessor to exit during an init restart.
const RESTART_GRACE: Duration = Duration::from_secs(10);

/// Errors from lock acquisition.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("{role} lock already held by pid {pid}")]
    AlreadyHeld { role: String, pid: i32 },

    #[error("lock io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Held singleton lock. Released (and the file removed) on drop.
pub struct DaemonLock {
    // NOTE(lifetime): held to keep the exclusive lock; released on drop
    #[allow(dead_code)]
    file: File,
    path: PathBuf,
    role: String,
}

impl DaemonLock {
    /// Acquire the singleton lock for a daemon role.
    ///
    /// On conflict with a live holder, fails with
    /// [`LockError::AlreadyHeld`], unless this process was started by
    /// the host init system, in which case the predecessor gets a
    /// bounded grace to exit and is then overridden.
    pub fn acquire(role: &str, locks_dir: &Path) -> Result<Self, LockError> {
        std::fs::create_dir_all(locks_dir)?;
        let path = locks_dir.join(format!("{role}.lock"));

        match try_take(&path, role)? {
            Some(lock) => Ok(lock),
            None => {
                let holder = read_holder_pid(&path);

                if let Some(pid) = holder {
                    if !holder_looks_valid(pid, role, read_holder_cwd(&path)) {
                        // Range lock says live, metadata says not ours:
                        // pid reuse or an unrelated process. Surface the
                        // conflict rather than fight over the file.
                        warn!(role, pid, "lock holder does not look like a {role} daemon");
                    }
                }

                if started_by_init() {
                    info!(role, "init-driven restart detected, waiting for predecessor");
                    let deadline = std::time::Instant::now() + RESTART_GRACE;
                    while std::time::Instant::now() < deadline {
                        std::thread::sleep(RESTART_POLL);
                        if let Some(lock) = try_take(&path, role)? {
                            return Ok(lock);
                        }
                    }
                    // Trust the init system over the stale holder: break
                    // the old inode and lock a fresh file.
                    warn!(role, "predecessor still alive after grace, overriding lock");
                    std::fs::remove_file(&path).ok();
                    if let Some(lock) = try_take(&path, role)? {
                        return Ok(lock);
                    }
                }

                Err(LockError::AlreadyHeld {
                    role: role.to_string(),
                    pid: holder.unwrap_or(-1),
                })
            }
        }
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DaemonLock {
    fn drop(&mut self) {
        // Unlocking happens implicitly when the file closes; remove the
        // metadata file so diagnostics don't report a stale holder.
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(role = %self.role, error = %e, "failed to remove lock file");
        }
    }
}

/// Try to take the lock once. `None` means a live holder owns it.
fn try_take(path: &Path, role: &str) -> Result<Option<DaemonLock>, LockError> {
    // Open without truncating so a failed attempt doesn't wipe the
    // holder's metadata.
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;

    if file.try_lock_exclusive().is_err() {
        return Ok(None);
    }

    let mut file = file;
    file.set_len(0)?;
    writeln!(file, "{}", std::process::id())?;
    writeln!(file, "{}", role)?;
    writeln!(
        file,
        "{}",
        std::env::current_dir().unwrap_or_default().display()
    )?;
    file.sync_all()?;

    Ok(Some(DaemonLock {
        file,
        path: path.to_path_buf(),
        role: role.to_string(),
    }))
}

/// Pid recorded in a lock file, if readable.
pub fn read_holder_pid(path: &Path) -> Option<i32> {
    std::fs::read_to_string(path)
        .ok()?
        .lines()
        .next()?
        .trim()
        .parse()
        .ok()
}

/// Working directory recorded in a lock file (third line).
fn read_holder_cwd(path: &Path) -> Option<PathBuf> {
    let contents = std::fs::read_to_string(path).ok()?;
    contents.lines().nth(2).map(PathBuf::from)
}

/// Whether the recorded pid is a live process whose command line
/// mentions the expected role and whose working directory matches the
/// lock metadata. Best-effort outside Linux.
fn holder_looks_valid(pid: i32, role: &str, recorded_cwd: Option<PathBuf>) -> bool {
    if !pid_alive(pid) {
        return false;
    }

    #[cfg(target_os = "linux")]
    {
        if let Ok(cmdline) = std::fs::read_to_string(format!("/proc/{pid}/cmdline")) {
            let cmdline = cmdline.replace('\0', " ");
            if !cmdline.contains(role) && !cmdline.contains("gafferd") {
                return false;
            }
        }
        if let (Some(recorded), Ok(actual)) = (
            recorded_cwd,
            std::fs::read_link(format!("/proc/{pid}/cwd")),
        ) {
            if recorded != actual {
                return false;
            }
        }
    }
    #[cfg(not(target_os = "linux"))]
    let _ = (role, recorded_cwd);
    true
}

/// Probe process liveness with a null signal.
pub fn pid_alive(pid: i32) -> bool {
    #[cfg(unix)]
    {
        nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid), None).is_ok()
    }
    #[cfg(not(unix))]
    {
        false
    }
}

/// Heuristics for "started by the host init system": systemd exports
/// `INVOCATION_ID`, and a reparented daemon has parent pid 1.
fn started_by_init() -> bool {
    if std::env::var_os("INVOCATION_ID").is_some() {
        return true;
    }
    #[cfg(unix)]
    {
        nix::unistd::getppid().as_raw() == 1
    }
    #[cfg(not(unix))]
    {
        false
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
