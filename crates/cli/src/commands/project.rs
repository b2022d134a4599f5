// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue commands: enqueue, list, status, cancel.

use super::open_store;
use crate::exit_error::ExitError;
use crate::output;
use clap::Args;
use gaffer_adapters::TmuxController;
use gaffer_core::{Clock, ProjectStatus, SystemClock};
use gaffer_engine::{EventBus, LifecycleManager, MessageBus};

#[derive(Args)]
pub struct EnqueueArgs {
    /// Path to the project specification file
    pub spec: String,
    /// Target working directory for the project
    #[arg(long)]
    pub project: Option<String>,
    /// Higher runs first (ties broken by enqueue age)
    #[arg(long, default_value_t = 0)]
    pub priority: i64,
    /// Batch label for grouped enqueues
    #[arg(long)]
    pub batch: Option<String>,
}

pub fn enqueue(args: EnqueueArgs) -> Result<(), ExitError> {
    let (_config, store) = open_store()?;
    let id = store.enqueue_project(
        &args.spec,
        args.project.as_deref(),
        args.priority,
        args.batch.as_deref(),
        SystemClock.epoch_secs(),
    )?;
    println!("{id}");
    Ok(())
}

#[derive(Args)]
pub struct ListArgs {
    /// Only rows in this status
    #[arg(long)]
    pub status: Option<String>,
}

pub fn list(args: ListArgs) -> Result<(), ExitError> {
    let status = match args.status.as_deref() {
        Some(raw) => Some(
            ProjectStatus::parse(raw)
                .ok_or_else(|| ExitError::new(2, format!("unknown status {raw:?}")))?,
        ),
        None => None,
    };

    let (_config, store) = open_store()?;
    let now = SystemClock.epoch_secs();
    for project in store.list_projects(status)? {
        println!("{}", output::project_line(&project, now));
    }
    Ok(())
}

#[derive(Args)]
pub struct StatusArgs {
    /// Queue row id
    pub id: i64,
}

pub fn status(args: StatusArgs) -> Result<(), ExitError> {
    let (_config, store) = open_store()?;
    let project = store.get_project(args.id)?;
    print!("{}", output::project_detail(&project, SystemClock.epoch_secs()));
    Ok(())
}

#[derive(Args)]
pub struct CancelArgs {
    /// Queue row id
    pub id: i64,
}

pub async fn cancel(args: CancelArgs) -> Result<(), ExitError> {
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

    lifecycle.cancel(args.id).await?;
    println!("cancelled {}", args.id);
    Ok(())
}
