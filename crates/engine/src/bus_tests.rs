// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use gaffer_core::test_support::agent;
use gaffer_core::FakeClock;
use gaffer_store::Store;
use std::time::Duration;

fn bus_with_rate(per_minute: u32) -> (MessageBus<FakeClock>, FakeClock) {
    let clock = FakeClock::new();
    let config = BusConfig {
        rate_per_minute: per_minute,
        ..BusConfig::default()
    };
    let bus = MessageBus::new(Store::open_in_memory().unwrap(), clock.clone(), config);
    (bus, clock)
}

fn bus() -> (MessageBus<FakeClock>, FakeClock) {
    bus_with_rate(600)
}

#[test]
fn send_and_pull_round_trip() {
    let (bus, _clock) = bus();
    let target = agent(1);
    let id = bus
        .send(&target, b"hello crew", 0, None, FifoScope::Agent, Some("proj"))
        .unwrap();

    let delivery = bus.pull(&target, PullMode::Normal, Some("proj")).unwrap().unwrap();
    assert_eq!(delivery.id, id);
    assert_eq!(delivery.payload, "hello crew");
    assert!(!delivery.is_rebrief);

    // Next pull acks: message is delivered, nothing new
    assert!(bus.pull(&target, PullMode::Normal, None).unwrap().is_none());
    assert_eq!(
        bus.store().get_message(id).unwrap().status,
        gaffer_core::MessageStatus::Delivered
    );
}

#[test]
fn check_idle_for_unknown_agent_is_an_error() {
    let (bus, _clock) = bus();
    assert!(matches!(
        bus.pull(&agent(9), PullMode::CheckIdle, None),
        Err(EngineError::AgentUnknown(_))
    ));
}

#[test]
fn check_idle_with_empty_queue_flags_ready() {
    let (bus, _clock) = bus();
    let target = agent(1);
    // First contact registers the agent
    bus.pull(&target, PullMode::Normal, None).unwrap();

    assert!(bus.pull(&target, PullMode::CheckIdle, None).unwrap().is_none());
    assert_eq!(
        bus.store().get_agent(&target).unwrap().unwrap().status,
        AgentStatus::Ready
    );
}

#[test]
fn budget_blocks_low_priority_but_not_critical() {
    // Budget of 1/minute: the second pull is rate limited
    let (bus, _clock) = bus_with_rate(1);
    let target = agent(1);

    bus.send(&target, b"low-1", 0, None, FifoScope::Agent, None).unwrap();
    bus.send(&target, b"low-2", 0, None, FifoScope::Agent, None).unwrap();

    assert!(bus.pull(&target, PullMode::Normal, None).unwrap().is_some());

    // Bucket dry, only low-priority waiting: budget exceeded, message pending
    assert!(matches!(
        bus.pull(&target, PullMode::Normal, None),
        Err(EngineError::BudgetExceeded(_))
    ));

    // A critical message enqueued later is not blocked by the dry bucket
    bus.send(&target, b"critical", 60, None, FifoScope::Agent, None).unwrap();
    let delivery = bus.pull(&target, PullMode::Normal, None).unwrap().unwrap();
    assert_eq!(delivery.payload, "critical");

    // The low-priority message is still pending, not lost
    assert_eq!(bus.store().pending_count(&target).unwrap(), 1);
}

#[test]
fn budget_refills_with_time() {
    let (bus, clock) = bus_with_rate(1);
    let target = agent(1);
    bus.send(&target, b"one", 0, None, FifoScope::Agent, None).unwrap();
    bus.send(&target, b"two", 0, None, FifoScope::Agent, None).unwrap();

    assert!(bus.pull(&target, PullMode::Normal, None).unwrap().is_some());
    assert!(bus.pull(&target, PullMode::Normal, None).is_err());

    clock.advance(Duration::from_secs(61));
    let delivery = bus.pull(&target, PullMode::Normal, None).unwrap().unwrap();
    assert_eq!(delivery.payload, "two");
}

#[test]
fn rebrief_mode_delivers_priority_200_with_snapshot_hash() {
    let dir = tempfile::tempdir().unwrap();
    let rules_path = dir.path().join("rules.md");
    std::fs::write(&rules_path, "# Communication\n- be kind\n").unwrap();

    let clock = FakeClock::new();
    let store = Store::open_in_memory().unwrap();
    let config = BusConfig {
        rules_doc_path: rules_path,
        ..BusConfig::default()
    };
    let bus = MessageBus::new(store, clock, config);
    let target = agent(1);

    // Seed a snapshot with activity history
    bus.store()
        .register_agent(&target, None, 10)
        .unwrap();
    bus.store()
        .save_snapshot(&ContextSnapshot {
            agent_session: target.clone(),
            last_briefing: None,
            briefing_content: "briefing v1".to_string(),
            activity_summary: "built the queue".to_string(),
            checkpoint_data: None,
            updated_at: 10,
        })
        .unwrap();

    let delivery = bus.pull(&target, PullMode::Rebrief, None).unwrap().unwrap();
    assert!(delivery.is_rebrief);
    assert_eq!(delivery.priority, REBRIEF_PRIORITY);

    let payload: serde_json::Value = serde_json::from_str(&delivery.payload).unwrap();
    assert_eq!(payload["type"], "rebrief");
    assert!(payload["rules"].as_str().unwrap().contains("be kind"));
    assert_eq!(payload["activity_summary"], "built the queue");

    // The agent's context blob hash equals the snapshot hash used
    let record = bus.store().get_agent(&target).unwrap().unwrap();
    assert_eq!(
        record.context_blob.as_deref(),
        Some(payload["snapshot_hash"].as_str().unwrap())
    );
    let stored = bus.store().load_snapshot(&target).unwrap().unwrap();
    assert_eq!(record.context_blob.unwrap(), snapshot_hash(&stored));
}

#[test]
fn rebrief_outranks_everything_else() {
    let (bus, _clock) = bus();
    let target = agent(1);
    bus.send(&target, b"urgent", 100, None, FifoScope::Agent, None).unwrap();

    let delivery = bus.pull(&target, PullMode::Rebrief, None).unwrap().unwrap();
    assert!(delivery.is_rebrief);
}

#[test]
fn clean_session_end_removes_the_agent() {
    let (bus, _clock) = bus();
    let target = agent(1);
    bus.send(&target, b"m", 0, None, FifoScope::Agent, None).unwrap();
    bus.pull(&target, PullMode::Normal, None).unwrap();

    bus.session_end(&target, true).unwrap();
    assert!(bus.store().get_agent(&target).unwrap().is_none());
}

#[test]
fn unclean_session_end_offlines_and_expires() {
    let (bus, _clock) = bus();
    let target = agent(1);
    let pulled = bus.send(&target, b"in-flight", 0, None, FifoScope::Agent, None).unwrap();
    let waiting = bus.send(&target, b"waiting", 0, None, FifoScope::Agent, None).unwrap();
    bus.pull(&target, PullMode::Normal, None).unwrap();

    bus.session_end(&target, false).unwrap();

    let record = bus.store().get_agent(&target).unwrap().unwrap();
    assert_eq!(record.status, AgentStatus::Offline);
    // In-flight message was acked, the waiting one expired
    assert_eq!(
        bus.store().get_message(pulled).unwrap().status,
        gaffer_core::MessageStatus::Delivered
    );
    assert_eq!(
        bus.store().get_message(waiting).unwrap().status,
        gaffer_core::MessageStatus::Expired
    );
}

#[test]
fn error_hook_records_the_error() {
    let (bus, _clock) = bus();
    let target = agent(1);
    bus.error_hook(&target, "tool exploded").unwrap();

    let record = bus.store().get_agent(&target).unwrap().unwrap();
    assert_eq!(record.status, AgentStatus::Error);
    assert_eq!(record.last_error.as_deref(), Some("tool exploded"));
}

#[test]
fn maintenance_requeues_stale_pulls() {
    let (bus, clock) = bus();
    let target = agent(1);
    let id = bus.send(&target, b"m", 0, None, FifoScope::Agent, None).unwrap();
    bus.pull(&target, PullMode::Normal, None).unwrap();

    clock.advance(Duration::from_secs(31));
    assert_eq!(bus.maintenance().unwrap(), 1);
    assert_eq!(
        bus.store().get_message(id).unwrap().status,
        gaffer_core::MessageStatus::Pending
    );
}
