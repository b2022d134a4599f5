// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process event bus with a daily append-only log and a
//! rate-limited operator notifier.
//!
//! Events fan out over a bounded broadcast channel (slow subscribers
//! lag and skip, producers never block) and every published event is
//! appended to `logs/events/YYYY-MM-DD.jsonl` by the single daemon
//! writer. Notifications pass a per-channel leaky bucket; emergencies
//! bypass it.

use crate::ratelimit::RateLimiter;
use gaffer_adapters::NotifyAdapter;
use gaffer_core::{BusEvent, Clock, EventSeverity};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::PathBuf;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Bounded fan-out buffer.
const EVENT_BUFFER: usize = 100;

/// One line of the daily event log. Readers must tolerate unknown
/// fields, so deserialization is permissive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogRecord {
    /// Epoch milliseconds
    pub ts: u64,
    pub channel: String,
    pub severity: String,
    pub payload: serde_json::Value,
}

/// In-process publish/subscribe plus the append-only log.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BusEvent>,
    log_dir: Option<PathBuf>,
}

impl EventBus {
    /// Bus without a log directory (tests, tools).
    pub fn in_memory() -> Self {
        let (tx, _) = broadcast::channel(EVENT_BUFFER);
        Self { tx, log_dir: None }
    }

    /// Bus appending to daily files under `log_dir`.
    pub fn with_log_dir(log_dir: PathBuf) -> Self {
        let (tx, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            tx,
            log_dir: Some(log_dir),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.tx.subscribe()
    }

    /// Publish an event: fan out to subscribers and append to the log.
    /// Never blocks the caller; log failures are reported and dropped.
    pub fn publish(&self, event: BusEvent) {
        self.publish_at(event, epoch_ms_now());
    }

    /// Publish with an explicit timestamp (testable path).
    pub fn publish_at(&self, event: BusEvent, ts: u64) {
        if let Err(e) = self.append_log(&event, ts) {
            warn!(error = %e, "event log append failed");
        }
        // No subscribers is fine; lagging subscribers skip
        let _ = self.tx.send(event);
    }

    fn append_log(&self, event: &BusEvent, ts: u64) -> std::io::Result<()> {
        let Some(dir) = &self.log_dir else {
            return Ok(());
        };
        std::fs::create_dir_all(dir)?;

        let record = EventLogRecord {
            ts,
            channel: event.channel().to_string(),
            severity: event.severity().to_string(),
            payload: serde_json::to_value(event).unwrap_or(serde_json::Value::Null),
        };
        let line = serde_json::to_string(&record)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        let path = dir.join(format!("{}.jsonl", daily_stamp(ts)));
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Path of the daily log file for a timestamp.
    pub fn log_path_for(&self, ts: u64) -> Option<PathBuf> {
        self.log_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.jsonl", daily_stamp(ts))))
    }
}

/// `YYYY-MM-DD` for an epoch-milliseconds timestamp.
fn daily_stamp(ts: u64) -> String {
    chrono::DateTime::from_timestamp_millis(ts as i64)
        .unwrap_or_default()
        .format("%Y-%m-%d")
        .to_string()
}

fn epoch_ms_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Operator-surface notifier with a per-channel leaky bucket.
/// Emergency-severity events bypass the bucket.
#[derive(Clone)]
pub struct RateLimitedNotifier<N: NotifyAdapter, C: Clock> {
    notifier: N,
    clock: C,
    limiter: RateLimiter,
}

impl<N: NotifyAdapter, C: Clock> RateLimitedNotifier<N, C> {
    pub fn new(notifier: N, clock: C, per_minute: u32) -> Self {
        Self {
            notifier,
            clock,
            limiter: RateLimiter::new(per_minute),
        }
    }

    /// Forward one event to the operator surface, subject to the
    /// channel budget.
    pub async fn handle(&self, event: &BusEvent) {
        let severity = event.severity();
        if severity != EventSeverity::Emergency
            && !self.limiter.try_acquire(event.channel(), self.clock.now())
        {
            debug!(channel = event.channel(), "notification rate limited");
            return;
        }

        let title = format!("gaffer {}", event.channel().replace('_', " "));
        if let Err(e) = self.notifier.notify(&title, &event.log_summary()).await {
            warn!(error = %e, "operator notification failed");
        }
    }

    /// Drain events from a subscription until cancelled.
    pub async fn run(self, mut rx: broadcast::Receiver<BusEvent>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                received = rx.recv() => match received {
                    Ok(event) => self.handle(&event).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "notifier lagged behind the event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                },
            }
        }
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
