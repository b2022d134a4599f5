// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use gaffer_adapters::FakeSessionController;
use gaffer_core::test_support::{agent, comm_rule};
use gaffer_core::{FakeClock, ProjectStatus};
use gaffer_store::{EnqueueMessage, TransitionUpdate};
use serial_test::serial;

fn enqueue_text(store: &Store, to: &AgentId, text: &str) {
    store
        .enqueue_message(
            EnqueueMessage {
                agent: to,
                project_name: None,
                payload: text.as_bytes(),
                priority: 0,
                dependency_id: None,
                fifo_scope: gaffer_core::FifoScope::Agent,
            },
            100,
        )
        .unwrap();
}

fn scan_fixture() -> (Store, Analyzer<PatternEvaluator>, ViolationEmitter, EventBus, FakeClock) {
    let store = Store::open_in_memory().unwrap();
    let rules = ActiveRuleSet::new();
    rules.swap(vec![comm_rule(1, "(?i)bypass")]);
    (
        store,
        Analyzer::new(rules, PatternEvaluator::new()),
        ViolationEmitter::default(),
        EventBus::in_memory(),
        FakeClock::new(),
    )
}

#[tokio::test]
#[serial]
async fn scan_publishes_violations_and_advances_the_cursor() {
    std::env::remove_var("EMERGENCY_BYPASS");
    let (store, analyzer, emitter, events, clock) = scan_fixture();
    let mut rx = events.subscribe();

    enqueue_text(&store, &agent(1), "all good here");
    enqueue_text(&store, &agent(2), "{\"from\": \"test:3\", \"text\": \"let's bypass the hub\"}");

    let cursor = scan_messages(&store, &analyzer, &emitter, &events, &clock, 0)
        .await
        .unwrap();
    assert_eq!(cursor, store.max_message_id().unwrap());

    let event = rx.try_recv().unwrap();
    let BusEvent::Violation { violation } = event else {
        panic!("expected a violation event");
    };
    assert_eq!(violation.sender, agent(3));
    assert_eq!(violation.recipient, agent(2));
    assert_eq!(violation.rule_ids, vec!["comm-001"]);

    // Nothing further queued
    assert!(rx.try_recv().is_err());

    // Re-scanning from the cursor finds nothing new
    let again = scan_messages(&store, &analyzer, &emitter, &events, &clock, cursor)
        .await
        .unwrap();
    assert_eq!(again, cursor);
}

#[tokio::test]
#[serial]
async fn emergency_bypass_suppresses_analysis() {
    std::env::set_var("EMERGENCY_BYPASS", "1");
    let (store, analyzer, emitter, events, clock) = scan_fixture();
    let mut rx = events.subscribe();

    enqueue_text(&store, &agent(1), "bypass everything");
    let cursor = scan_messages(&store, &analyzer, &emitter, &events, &clock, 0)
        .await
        .unwrap();

    // Cursor still advances; no events emitted
    assert_eq!(cursor, store.max_message_id().unwrap());
    assert!(rx.try_recv().is_err());
    std::env::remove_var("EMERGENCY_BYPASS");
}

#[test]
fn sender_attribution_prefers_the_from_field() {
    let with_from = gaffer_core::Message::builder()
        .agent_session("proj:1")
        .payload(br#"{"from": "proj:0", "text": "hi"}"#.to_vec())
        .build();
    assert_eq!(message_sender(&with_from).as_str(), "proj:0");

    let plain = gaffer_core::Message::builder()
        .agent_session("proj:1")
        .payload(b"plain note".to_vec())
        .build();
    assert_eq!(message_sender(&plain).as_str(), "proj:1");

    let bad_from = gaffer_core::Message::builder()
        .agent_session("proj:1")
        .payload(br#"{"from": "not-a-target"}"#.to_vec())
        .build();
    assert_eq!(message_sender(&bad_from).as_str(), "proj:1");
}

#[tokio::test]
async fn orphan_cleanup_kills_sessions_of_terminal_projects() {
    let store = Store::open_in_memory().unwrap();
    let sessions = FakeSessionController::new();

    // Terminal project with a surviving session
    let done = store.enqueue_project("/s/a.md", None, 0, None, 1).unwrap();
    store.claim_next_project(2).unwrap();
    store.record_supervision(done, Some("gaffer-1"), None).unwrap();
    store
        .transition_project(done, ProjectStatus::Completed, TransitionUpdate::default(), 3)
        .unwrap();
    sessions.add_session("gaffer-1", &["main"], 0);

    // Live project keeps its session
    let live = store.enqueue_project("/s/b.md", None, 0, None, 4).unwrap();
    store.claim_next_project(5).unwrap();
    store.record_supervision(live, Some("gaffer-2"), None).unwrap();
    sessions.add_session("gaffer-2", &["main"], 0);

    let killed = cleanup_orphan_sessions(&store, &sessions).await.unwrap();
    assert_eq!(killed, 1);
    assert!(!sessions.session_alive("gaffer-1").await.unwrap());
    assert!(sessions.session_alive("gaffer-2").await.unwrap());
}
