// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! gaffer - supervise crews of coding agents in tmux sessions

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod commands;
mod exit_error;
mod output;

use clap::{Parser, Subcommand};
use commands::{daemon, project, pull, recovery};

#[derive(Parser)]
#[command(
    name = "gaffer",
    version,
    about = "gaffer - an automated foreman for your agent crews"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enqueue a project (idempotent; prints the queue id)
    Enqueue(project::EnqueueArgs),
    /// List queue rows
    List(project::ListArgs),
    /// Show full project state
    Status(project::StatusArgs),
    /// Cancel a project: graceful stop, then kill
    Cancel(project::CancelArgs),
    /// Scheduler daemon management
    Scheduler(daemon::SchedulerArgs),
    /// Queue-processor daemon management
    Queue(daemon::QueueArgs),
    /// Stuck-project recovery tools
    Recovery(recovery::RecoveryArgs),
    /// Agent-side pull hook (returns at most one message as JSON)
    Pull(pull::PullArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Enqueue(args) => project::enqueue(args),
        Commands::List(args) => project::list(args),
        Commands::Status(args) => project::status(args),
        Commands::Cancel(args) => project::cancel(args).await,
        Commands::Scheduler(args) => daemon::scheduler(args).await,
        Commands::Queue(args) => daemon::queue(args).await,
        Commands::Recovery(args) => recovery::run(args).await,
        Commands::Pull(args) => pull::run(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(e.code);
    }
}
