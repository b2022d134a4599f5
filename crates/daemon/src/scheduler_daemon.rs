// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The scheduler daemon: periodic check-in firing and message-bus
//! maintenance. Singleton per host via the `scheduler` lock.

use crate::{DaemonConfig, DaemonError, DaemonRole};
use gaffer_adapters::{DaemonLock, NoOpSessionController, ProcessManager};
use gaffer_core::SystemClock;
use gaffer_engine::{EventBus, MessageBus, QueueScheduler, SchedulerConfig};
use gaffer_store::Store;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Check-in tick cadence; due tasks fire within a minute.
const CHECKIN_TICK: Duration = Duration::from_secs(30);

/// Message-bus maintenance cadence (stale-pull requeue).
const MAINTENANCE_TICK: Duration = Duration::from_secs(15);

/// Run the scheduler daemon until the stop token fires.
pub async fn run_scheduler(
    config: DaemonConfig,
    cancel: CancellationToken,
) -> Result<(), DaemonError> {
    let _lock = DaemonLock::acquire(DaemonRole::Scheduler.lock_name(), &config.locks_dir)?;
    let store = Store::open(&config.db_path)?;
    let clock = SystemClock;

    let bus = MessageBus::new(store.clone(), clock.clone(), config.bus_config());
    let events = EventBus::with_log_dir(config.events_dir.clone());
    // This daemon never admits projects; the scheduler is built over a
    // no-op session layer purely for its check-in machinery.
    let scheduler = QueueScheduler::new(
        store.clone(),
        ProcessManager::new(NoOpSessionController::new()),
        clock,
        events,
        SchedulerConfig {
            setup_command: Vec::new(),
            ..config.scheduler_config()
        },
    );
    let roles = config.roles();

    info!(state_dir = %config.state_dir.display(), "scheduler daemon ready");

    // NOTE: intervals live outside the loop; select! re-evaluates
    // branches each iteration and would otherwise reset them.
    let mut checkin_tick = tokio::time::interval(CHECKIN_TICK);
    let mut maintenance_tick = tokio::time::interval(MAINTENANCE_TICK);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            _ = checkin_tick.tick() => {
                match scheduler.fire_due_checkins(&bus, &roles) {
                    Ok(fired) if fired > 0 => info!(fired, "check-ins fired"),
                    Ok(_) => {}
                    Err(e) => error!(error = %e, "check-in tick failed"),
                }
            }

            _ = maintenance_tick.tick() => {
                if let Err(e) = bus.maintenance() {
                    error!(error = %e, "message-bus maintenance failed");
                }
            }
        }
    }

    info!("scheduler daemon stopped");
    Ok(())
}
