// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The queue-processor daemon: reboot recovery, serial admission,
//! process supervision callbacks, the phantom/zombie sweep, the
//! compliance scanner, and the rate-limited operator notifier.
//! Singleton per host via the `queue-processor` lock.

use crate::{env, DaemonConfig, DaemonError, DaemonRole};
use gaffer_adapters::{
    DaemonLock, DesktopNotifyAdapter, ProcessEvent, ProcessManager, SessionController,
    TmuxController,
};
use gaffer_core::{AgentId, BusEvent, Clock, Message, SystemClock};
use gaffer_engine::{
    EventBus, LifecycleManager, MessageBus, QueueScheduler, RateLimitedNotifier,
};
use gaffer_compliance::{
    run_rules_watcher, ActiveRuleSet, Analyzer, PatternEvaluator, ViolationEmitter,
};
use gaffer_store::Store;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Admission attempt cadence; an idle queue admits within one tick.
const ADMIT_TICK: Duration = Duration::from_secs(1);

/// Compliance scan cadence over newly recorded messages.
const COMPLIANCE_TICK: Duration = Duration::from_secs(5);

/// Messages scanned per compliance tick.
const COMPLIANCE_BATCH: usize = 64;

/// Notifier budget (events per minute per channel).
const NOTIFY_PER_MINUTE: u32 = 10;

/// Auto-restart scan cadence over errored agents.
const RESTART_TICK: Duration = Duration::from_secs(30);

/// Run the queue-processor daemon until the stop token fires.
pub async fn run_queue(config: DaemonConfig, cancel: CancellationToken) -> Result<(), DaemonError> {
    let _lock = DaemonLock::acquire(DaemonRole::QueueProcessor.lock_name(), &config.locks_dir)?;
    let store = Store::open(&config.db_path)?;
    let sessions = TmuxController::new();
    let clock = SystemClock;

    let events = EventBus::with_log_dir(config.events_dir.clone());
    let bus = MessageBus::new(store.clone(), clock.clone(), config.bus_config());
    let lifecycle = LifecycleManager::new(
        store.clone(),
        sessions.clone(),
        clock.clone(),
        events.clone(),
        bus.clone(),
        config.lifecycle_config(),
    );
    let scheduler = QueueScheduler::new(
        store.clone(),
        ProcessManager::new(sessions.clone()),
        clock.clone(),
        events.clone(),
        config.scheduler_config(),
    );

    // Compliance: watcher reloads the rule set, the scanner tails the
    // message queue against it.
    let active_rules = ActiveRuleSet::new();
    tokio::spawn(run_rules_watcher(
        config.rules_doc_path.clone(),
        active_rules.clone(),
        cancel.child_token(),
    ));
    let analyzer = Analyzer::new(active_rules, PatternEvaluator::new());
    let emitter = ViolationEmitter::default();
    let mut compliance_cursor = store.max_message_id()?;

    // Operator notifications off the event bus
    tokio::spawn(
        RateLimitedNotifier::new(DesktopNotifyAdapter::new(), clock.clone(), NOTIFY_PER_MINUTE)
            .run(events.subscribe(), cancel.child_token()),
    );

    // Status feedback from supervised setup processes
    let (process_tx, mut process_rx) = mpsc::channel::<ProcessEvent>(32);

    // Reconcile whatever a reboot left behind before admitting anew
    lifecycle.recover_on_reboot().await?;
    match cleanup_orphan_sessions(&store, &sessions).await {
        Ok(0) => {}
        Ok(killed) => info!(killed, "cleaned up orphaned sessions"),
        Err(e) => warn!(error = %e, "orphan session cleanup failed"),
    }

    info!(state_dir = %config.state_dir.display(), "queue daemon ready");

    let mut admit_tick = tokio::time::interval(ADMIT_TICK);
    let mut sweep_tick =
        tokio::time::interval(Duration::from_secs(env::state_sync_interval_secs().max(1)));
    let mut compliance_tick = tokio::time::interval(COMPLIANCE_TICK);
    let mut restart_tick = tokio::time::interval(RESTART_TICK);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            _ = admit_tick.tick() => {
                match scheduler.try_admit(&process_tx) {
                    Ok(Some(project)) => info!(project_id = project.id, "admitted project"),
                    Ok(None) => {}
                    Err(e) => error!(error = %e, "admission failed"),
                }
            }

            Some(event) = process_rx.recv() => {
                if let Err(e) = lifecycle.handle_process_event(event).await {
                    error!(error = %e, "process event handling failed");
                }
            }

            _ = sweep_tick.tick() => {
                if let Err(e) = lifecycle.sweep().await {
                    error!(error = %e, "phantom/zombie sweep failed");
                }
            }

            _ = compliance_tick.tick() => {
                match scan_messages(&store, &analyzer, &emitter, &events, &clock, compliance_cursor).await {
                    Ok(cursor) => compliance_cursor = cursor,
                    Err(e) => error!(error = %e, "compliance scan failed"),
                }
            }

            _ = restart_tick.tick() => {
                match lifecycle.restart_errored_agents().await {
                    Ok(0) => {}
                    Ok(restarted) => info!(restarted, "auto-restarted errored agents"),
                    Err(e) => error!(error = %e, "agent restart pass failed"),
                }
            }
        }
    }

    info!("queue daemon stopped");
    Ok(())
}

/// Evaluate newly recorded messages against the active rule set and
/// publish violations. Returns the advanced cursor.
async fn scan_messages<C: Clock>(
    store: &Store,
    analyzer: &Analyzer<PatternEvaluator>,
    emitter: &ViolationEmitter,
    events: &EventBus,
    clock: &C,
    cursor: i64,
) -> Result<i64, DaemonError> {
    let mut cursor = cursor;
    let bypass = env::emergency_bypass();

    for message in store.messages_after(cursor, COMPLIANCE_BATCH)? {
        cursor = message.id;
        if bypass {
            continue;
        }

        let text = message.payload_utf8();
        let report = match analyzer.analyze(&text).await {
            Ok(report) => report,
            Err(e) => {
                warn!(message_id = message.id, error = %e, "message analysis failed");
                continue;
            }
        };

        let sender = message_sender(&message);
        if let Some(violation) = emitter.emit(
            &report,
            &sender,
            &message.agent_session,
            clock.epoch_secs(),
        ) {
            warn!(
                message_id = message.id,
                rules = ?violation.rule_ids,
                "compliance violation detected"
            );
            events.publish(BusEvent::Violation { violation });
        }
    }

    Ok(cursor)
}

/// Sender attribution: hub-and-spoke messages carry a `from` field in
/// their JSON payload; anything else is attributed to the recipient's
/// own window (self-notes, daemon notices).
fn message_sender(message: &Message) -> AgentId {
    serde_json::from_slice::<serde_json::Value>(&message.payload)
        .ok()
        .and_then(|v| v.get("from")?.as_str().map(String::from))
        .and_then(|s| AgentId::parse(&s).ok())
        .unwrap_or_else(|| message.agent_session.clone())
}

/// Kill the sessions the multiplexer still holds for terminal
/// projects (graceful cleanup of orphaned sessions).
pub async fn cleanup_orphan_sessions(
    store: &Store,
    sessions: &impl SessionController,
) -> Result<usize, DaemonError> {
    let mut killed = 0;
    let live = sessions.list_sessions().await.map_err(gaffer_engine::EngineError::from)?;

    for project in store.list_projects(None)? {
        if !project.status.is_terminal() {
            continue;
        }
        if let Some(name) = &project.session_name {
            if live.iter().any(|s| s == name) {
                warn!(project_id = project.id, session = name, "killing orphaned session");
                sessions
                    .kill_session(name)
                    .await
                    .map_err(gaffer_engine::EngineError::from)?;
                killed += 1;
            }
        }
    }
    Ok(killed)
}

#[cfg(test)]
#[path = "queue_daemon_tests.rs"]
mod tests;
