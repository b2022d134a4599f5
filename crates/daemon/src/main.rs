// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! gafferd: the gaffer daemons.
//!
//! `gafferd scheduler` runs the check-in scheduler; `gafferd queue`
//! runs the queue processor. Each role is a singleton per host; both
//! share the store and are normally started by the `gaffer` CLI.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use gaffer_daemon::{
    config::DaemonConfig, logging, run_queue, run_scheduler, DaemonError, DaemonRole,
};
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

fn usage() -> ! {
    eprintln!("Usage: gafferd <scheduler|queue> [--help | --version]");
    std::process::exit(2);
}

#[tokio::main]
async fn main() {
    let arg = std::env::args().nth(1);
    let role = match arg.as_deref() {
        Some("--version") | Some("-V") => {
            println!("gafferd {}", env!("CARGO_PKG_VERSION"));
            return;
        }
        Some("--help") | Some("-h") | Some("help") => {
            println!("gafferd {}", env!("CARGO_PKG_VERSION"));
            println!("Runs one gaffer daemon role until stopped.");
            println!();
            println!("USAGE:");
            println!("    gafferd <scheduler|queue>");
            println!();
            println!("Typically started via `gaffer scheduler daemon` or");
            println!("`gaffer queue daemon`.");
            return;
        }
        Some(role) => match DaemonRole::parse(role) {
            Some(role) => role,
            None => usage(),
        },
        None => usage(),
    };

    let config = match DaemonConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(4);
        }
    };

    let log_path = config.log_path(role.lock_name());
    logging::rotate_log_if_needed(&log_path);
    let _log_guard = match logging::setup_logging(&log_path) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(4);
        }
    };

    info!(%role, "starting daemon");
    match run_role(role, config).await {
        Ok(()) => {}
        Err(DaemonError::Lock(e)) => {
            error!(error = %e, "another daemon holds the lock");
            eprintln!("error: {e}");
            std::process::exit(3);
        }
        Err(e) => {
            error!(error = %e, "daemon failed");
            eprintln!("error: {e}");
            std::process::exit(4);
        }
    }
}

async fn run_role(role: DaemonRole, config: DaemonConfig) -> Result<(), DaemonError> {
    let cancel = CancellationToken::new();
    spawn_signal_listener(cancel.clone())?;

    match role {
        DaemonRole::Scheduler => run_scheduler(config, cancel).await,
        DaemonRole::QueueProcessor => run_queue(config, cancel).await,
    }
}

/// Translate SIGTERM/SIGINT into the stop token.
fn spawn_signal_listener(cancel: CancellationToken) -> Result<(), DaemonError> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
            _ = sigint.recv() => info!("received SIGINT, shutting down"),
        }
        cancel.cancel();
    });
    Ok(())
}
