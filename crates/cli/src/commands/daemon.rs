// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon subcommands: run one role in the foreground.

use crate::exit_error::ExitError;
use clap::{Args, Subcommand};
use gaffer_daemon::{run_queue, run_scheduler, DaemonConfig};
use tokio_util::sync::CancellationToken;

#[derive(Args)]
pub struct SchedulerArgs {
    #[command(subcommand)]
    pub command: SchedulerCommands,
}

#[derive(Subcommand)]
pub enum SchedulerCommands {
    /// Run the scheduler daemon (singleton per host)
    Daemon,
}

#[derive(Args)]
pub struct QueueArgs {
    #[command(subcommand)]
    pub command: QueueCommands,
}

#[derive(Subcommand)]
pub enum QueueCommands {
    /// Run the queue-processor daemon (singleton per host)
    Daemon,
}

pub async fn scheduler(args: SchedulerArgs) -> Result<(), ExitError> {
    match args.command {
        SchedulerCommands::Daemon => {
            let config = DaemonConfig::load()?;
            run_scheduler(config, signal_token()?).await?;
            Ok(())
        }
    }
}

pub async fn queue(args: QueueArgs) -> Result<(), ExitError> {
    match args.command {
        QueueCommands::Daemon => {
            let config = DaemonConfig::load()?;
            run_queue(config, signal_token()?).await?;
            Ok(())
        }
    }
}

/// Stop token wired to SIGTERM/SIGINT.
fn signal_token() -> Result<CancellationToken, ExitError> {
    use tokio::signal::unix::{signal, SignalKind};

    let cancel = CancellationToken::new();
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| ExitError::new(4, format!("signal handler: {e}")))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| ExitError::new(4, format!("signal handler: {e}")))?;

    let token = cancel.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = sigint.recv() => {}
        }
        token.cancel();
    });
    Ok(cancel)
}
