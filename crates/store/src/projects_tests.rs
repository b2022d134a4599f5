// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::Store;
use gaffer_core::ProjectStatus;
use proptest::prelude::*;

fn store() -> Store {
    Store::open_in_memory().unwrap()
}

#[test]
fn enqueue_is_idempotent_within_active_window() {
    let store = store();
    let a = store.enqueue_project("/s/a.md", Some("/p/a"), 0, None, 100).unwrap();
    let b = store.enqueue_project("/s/a.md", Some("/p/a"), 5, None, 200).unwrap();
    assert_eq!(a, b);
    assert_eq!(store.list_projects(None).unwrap().len(), 1);

    // A different path is a different project
    let c = store.enqueue_project("/s/a.md", Some("/p/b"), 0, None, 300).unwrap();
    assert_ne!(a, c);
}

#[test]
fn enqueue_after_terminal_creates_a_new_row() {
    let store = store();
    let a = store.enqueue_project("/s/a.md", None, 0, None, 100).unwrap();
    store.claim_next_project(110).unwrap();
    store
        .transition_project(a, ProjectStatus::Failed, TransitionUpdate::error("boom"), 120)
        .unwrap();

    let b = store.enqueue_project("/s/a.md", None, 0, None, 130).unwrap();
    assert_ne!(a, b);
}

#[test]
fn claim_order_is_priority_then_age() {
    let store = store();
    let a = store.enqueue_project("/s/a.md", None, 0, None, 100).unwrap();
    let b = store.enqueue_project("/s/b.md", None, 0, None, 200).unwrap();
    let c = store.enqueue_project("/s/c.md", None, 1, None, 300).unwrap();

    // C first by priority
    let first = store.claim_next_project(400).unwrap().unwrap();
    assert_eq!(first.id, c);
    assert_eq!(first.status, ProjectStatus::Processing);

    // Slot occupied: no second claim
    assert!(store.claim_next_project(401).unwrap().is_none());

    // A before B by enqueue time once C finishes
    store
        .transition_project(c, ProjectStatus::Completed, TransitionUpdate::default(), 500)
        .unwrap();
    assert_eq!(store.claim_next_project(501).unwrap().unwrap().id, a);
    store
        .transition_project(a, ProjectStatus::Completed, TransitionUpdate::default(), 600)
        .unwrap();
    assert_eq!(store.claim_next_project(601).unwrap().unwrap().id, b);
}

#[test]
fn credit_paused_holds_the_admission_slot() {
    let store = store();
    let a = store.enqueue_project("/s/a.md", None, 0, None, 100).unwrap();
    store.enqueue_project("/s/b.md", None, 0, None, 100).unwrap();

    store.claim_next_project(110).unwrap();
    store
        .transition_project(a, ProjectStatus::CreditPaused, TransitionUpdate::default(), 120)
        .unwrap();

    assert!(store.claim_next_project(130).unwrap().is_none());

    // Credit returns: resume, then finish, then the next is admitted
    store
        .transition_project(a, ProjectStatus::Processing, TransitionUpdate::default(), 140)
        .unwrap();
    store
        .transition_project(a, ProjectStatus::Completed, TransitionUpdate::default(), 150)
        .unwrap();
    assert!(store.claim_next_project(160).unwrap().is_some());
}

#[test]
fn illegal_transition_is_rejected() {
    let store = store();
    let a = store.enqueue_project("/s/a.md", None, 0, None, 100).unwrap();

    let err = store
        .transition_project(a, ProjectStatus::Completed, TransitionUpdate::default(), 110)
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::IllegalTransition {
            from: ProjectStatus::Queued,
            to: ProjectStatus::Completed
        }
    ));
}

#[test]
fn terminal_rows_are_frozen() {
    let store = store();
    let a = store.enqueue_project("/s/a.md", None, 0, None, 100).unwrap();
    store.claim_next_project(110).unwrap();
    store
        .transition_project(a, ProjectStatus::Completed, TransitionUpdate::default(), 120)
        .unwrap();

    let err = store
        .transition_project(a, ProjectStatus::Failed, TransitionUpdate::default(), 130)
        .unwrap_err();
    assert!(matches!(err, StoreError::IllegalTransition { .. }));

    let err = store.record_supervision(a, Some("sess"), None).unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[test]
fn timeout_extensions_accumulate() {
    let store = store();
    let a = store.enqueue_project("/s/a.md", None, 0, None, 100).unwrap();
    store.claim_next_project(110).unwrap();

    assert_eq!(store.extend_timeout(a, 120).unwrap(), 1);
    assert_eq!(store.extend_timeout(a, 130).unwrap(), 2);
}

#[test]
fn heal_admission_demotes_all_but_newest() {
    let store = store();
    let a = store.enqueue_project("/s/a.md", None, 0, None, 100).unwrap();
    let b = store.enqueue_project("/s/b.md", None, 0, None, 100).unwrap();

    store.claim_next_project(110).unwrap();
    // The API can't produce a second active row; corrupt the store the
    // way a crashed writer would to exercise the repair path.
    store
        .with_tx(|tx| {
            tx.execute(
                "UPDATE projects SET status = 'processing', started_at = 200 WHERE id = ?1",
                rusqlite::params![b],
            )?;
            Ok(())
        })
        .unwrap();

    let demoted = store.heal_admission().unwrap();
    assert_eq!(demoted, vec![a]);
    assert_eq!(store.get_project(a).unwrap().status, ProjectStatus::Queued);
    assert_eq!(store.get_project(b).unwrap().status, ProjectStatus::Processing);

    // Healthy store: heal reports nothing
    assert!(store.heal_admission().unwrap().is_empty());
}

#[test]
fn list_stuck_covers_zombie_timing_out_and_sessionless() {
    let store = store();
    let a = store.enqueue_project("/s/a.md", None, 0, None, 100).unwrap();
    store.claim_next_project(110).unwrap();
    store
        .transition_project(a, ProjectStatus::Zombie, TransitionUpdate::default(), 120)
        .unwrap();
    store
        .transition_project(a, ProjectStatus::Failed, TransitionUpdate::default(), 130)
        .unwrap();

    // Freed slot: a sessionless processing row counts as stuck
    let b = store.enqueue_project("/s/b.md", None, 0, None, 140).unwrap();
    store.claim_next_project(150).unwrap();

    let stuck = store.list_stuck().unwrap();
    assert_eq!(stuck.len(), 1);
    assert_eq!(stuck[0].id, b);

    // Recording a session clears it
    store.record_supervision(b, Some("proj-b"), Some(4242)).unwrap();
    assert!(store.list_stuck().unwrap().is_empty());
}

#[test]
fn reset_requires_force_on_terminal_rows() {
    let store = store();
    let a = store.enqueue_project("/s/a.md", None, 0, None, 100).unwrap();
    store.claim_next_project(110).unwrap();
    store
        .transition_project(a, ProjectStatus::Failed, TransitionUpdate::error("x"), 120)
        .unwrap();

    assert!(store.reset_project(a, false, false, 130).is_err());
    let reset = store.reset_project(a, false, true, 130).unwrap();
    assert_eq!(reset.status, ProjectStatus::Queued);
    assert_eq!(reset.retry_count, 1);
    assert!(reset.session_name.is_none());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// At most one row ever holds the admission slot, whatever the
    /// interleaving of enqueues, claims, and terminal transitions.
    #[test]
    fn admission_singleton_invariant(ops in prop::collection::vec(0u8..4, 1..40)) {
        let store = store();
        let mut next_spec = 0u32;
        let mut now = 1000i64;

        for op in ops {
            now += 1;
            match op {
                0 => {
                    next_spec += 1;
                    store.enqueue_project(&format!("/s/{next_spec}.md"), None, 0, None, now).unwrap();
                }
                1 => {
                    store.claim_next_project(now).unwrap();
                }
                2 => {
                    if let Some(p) = store
                        .list_projects(Some(ProjectStatus::Processing))
                        .unwrap()
                        .first()
                    {
                        store
                            .transition_project(p.id, ProjectStatus::Completed, TransitionUpdate::default(), now)
                            .unwrap();
                    }
                }
                _ => {
                    if let Some(p) = store
                        .list_projects(Some(ProjectStatus::Processing))
                        .unwrap()
                        .first()
                    {
                        store
                            .transition_project(p.id, ProjectStatus::Failed, TransitionUpdate::error("prop"), now)
                            .unwrap();
                    }
                }
            }

            let active = store
                .list_projects(None)
                .unwrap()
                .iter()
                .filter(|p| p.status.holds_admission_slot())
                .count();
            prop_assert!(active <= 1, "admission invariant violated: {active} active rows");
        }
    }

    /// Idempotence: repeated enqueues of the same key in the active
    /// window produce one row and identical ids.
    #[test]
    fn idempotent_enqueue_invariant(repeats in 1usize..6, priority in 0i64..5) {
        let store = store();
        let first = store.enqueue_project("/s/p.md", Some("/p"), priority, None, 100).unwrap();
        for i in 0..repeats {
            let id = store.enqueue_project("/s/p.md", Some("/p"), priority, None, 100 + i as i64).unwrap();
            prop_assert_eq!(id, first);
        }
        prop_assert_eq!(store.list_projects(None).unwrap().len(), 1);
    }
}
