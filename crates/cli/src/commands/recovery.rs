// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stuck-project recovery tools.

use super::open_store;
use crate::exit_error::ExitError;
use crate::output;
use clap::{Args, Subcommand};
use gaffer_adapters::lock::{pid_alive, read_holder_pid};
use gaffer_adapters::{SessionController, TmuxController};
use gaffer_core::{Clock, SystemClock};
use gaffer_engine::{EventBus, LifecycleManager, MessageBus};

#[derive(Args)]
pub struct RecoveryArgs {
    #[command(subcommand)]
    pub command: RecoveryCommands,
}

#[derive(Subcommand)]
pub enum RecoveryCommands {
    /// List zombie, timing-out, and sessionless-processing rows
    ListStuck,
    /// Return a stuck row to queued (or failed with --failed)
    Reset {
        id: i64,
        /// Mark failed instead of requeueing
        #[arg(long)]
        failed: bool,
        /// Allow resetting terminal rows
        #[arg(long)]
        force: bool,
    },
    /// Reap a zombie project
    KillZombie { id: i64 },
    /// Resume a credit-paused project (credit returned)
    ResumeCredit { id: i64 },
    /// Dump store summary, lock state, and live sessions
    Diagnostics,
}

pub async fn run(args: RecoveryArgs) -> Result<(), ExitError> {
    match args.command {
        RecoveryCommands::ListStuck => list_stuck(),
        RecoveryCommands::Reset { id, failed, force } => reset(id, failed, force),
        RecoveryCommands::KillZombie { id } => kill_zombie(id).await,
        RecoveryCommands::ResumeCredit { id } => resume_credit(id),
        RecoveryCommands::Diagnostics => diagnostics().await,
    }
}

fn list_stuck() -> Result<(), ExitError> {
    let (_config, store) = open_store()?;
    let now = SystemClock.epoch_secs();
    let stuck = store.list_stuck()?;
    if stuck.is_empty() {
        println!("no stuck projects");
        return Ok(());
    }
    for project in stuck {
        println!("{}", output::project_line(&project, now));
    }
    Ok(())
}

fn reset(id: i64, failed: bool, force: bool) -> Result<(), ExitError> {
    let (_config, store) = open_store()?;
    let project = store.reset_project(id, failed, force, SystemClock.epoch_secs())?;
    println!("{} -> {}", project.id, project.status);
    Ok(())
}

async fn kill_zombie(id: i64) -> Result<(), ExitError> {
    let (config, store) = open_store()?;
    let clock = SystemClock;
    let bus = MessageBus::new(store.clone(), clock.clone(), config.bus_config());
    let lifecycle = LifecycleManager::new(
        store,
        TmuxController::new(),
        clock,
        EventBus::with_log_dir(config.events_dir.clone()),
        bus,
        config.lifecycle_config(),
    );

    lifecycle.kill_zombie(id).await?;
    println!("reaped {id}");
    Ok(())
}

fn resume_credit(id: i64) -> Result<(), ExitError> {
    let (_config, store) = open_store()?;
    let project = store.transition_project(
        id,
        gaffer_core::ProjectStatus::Processing,
        gaffer_store::TransitionUpdate::default(),
        SystemClock.epoch_secs(),
    )?;
    println!("{} -> {}", project.id, project.status);
    Ok(())
}

async fn diagnostics() -> Result<(), ExitError> {
    let (config, store) = open_store()?;

    println!("# store");
    let summary = store.diagnostics_summary()?;
    for count in &summary.projects {
        println!("  projects.{:<14} {}", count.status, count.count);
    }
    for count in &summary.messages {
        println!("  messages.{:<14} {}", count.status, count.count);
    }
    for count in &summary.agents {
        println!("  agents.{:<16} {}", count.status, count.count);
    }
    println!("  checkin_tasks          {}", summary.checkin_tasks);

    println!("# locks");
    for role in ["scheduler", "queue-processor"] {
        let path = config.locks_dir.join(format!("{role}.lock"));
        match read_holder_pid(&path) {
            Some(pid) => {
                let state = if pid_alive(pid) { "live" } else { "stale" };
                println!("  {role:<16} pid {pid} ({state})");
            }
            None => println!("  {role:<16} free"),
        }
    }

    println!("# sessions");
    let sessions = TmuxController::new();
    match sessions.list_sessions().await {
        Ok(live) if live.is_empty() => println!("  none"),
        Ok(live) => {
            for name in live {
                println!("  {name}");
            }
        }
        Err(e) => println!("  unavailable: {e}"),
    }

    Ok(())
}
