// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for transient store failures.

use std::sync::Arc;

use tick::Clock;
use tracing_test::traced_test;
use vitrine_presence::{ClaimOutcome, ErrorKind, InMemoryPresenceStore, PresenceTracker, StreamCounters, StreamId, UserId};

fn setup() -> (Arc<InMemoryPresenceStore>, PresenceTracker<InMemoryPresenceStore>, StreamId) {
    let clock = Clock::new_frozen();
    let store = Arc::new(InMemoryPresenceStore::new(clock.clone()));
    let stream = StreamId::new("launch");
    store.create_stream(stream.clone());
    (Arc::clone(&store), PresenceTracker::new(store, clock), stream)
}

#[traced_test]
#[tokio::test]
async fn failed_session_insert_propagates() {
    let (store, tracker, stream) = setup();
    store.fail_next(1);

    let error = tracker.join(&stream, None, None).await.unwrap_err();

    assert!(error.is_transient());
    assert!(store.sessions(&stream).is_empty());
}

#[traced_test]
#[tokio::test]
async fn failed_increment_is_logged_and_swallowed() {
    let (store, tracker, stream) = setup();

    // The session insert succeeds, the increment that follows fails.
    store.fail_after(1, 1);
    let session = tracker.join(&stream, None, None).await.unwrap();

    assert_eq!(store.sessions(&stream), vec![session]);
    assert!(logs_contain("failed to increment viewer count"));
    assert!(logs_contain("error=presence operation failed (unavailable)"));

    // The count drifted low: nothing reconciles it.
    assert_eq!(tracker.counters(&stream).await.unwrap(), StreamCounters::default());
}

#[traced_test]
#[tokio::test]
async fn failed_claim_is_unavailable_and_retried_later() {
    let (store, tracker, stream) = setup();
    let viewer = UserId::new("u1");

    store.fail_next(1);
    let outcome = tracker.report_elapsed(&stream, &viewer, 10).await.unwrap();

    assert_eq!(outcome, Some(ClaimOutcome::Unavailable));
    assert!(!tracker.has_claimed());
    assert!(logs_contain("failed to claim presence bonus"));

    let retried = tracker.report_elapsed(&stream, &viewer, 11).await.unwrap();
    assert!(matches!(retried, Some(ClaimOutcome::Awarded(_))));
    assert_eq!(store.balance(&viewer), store.bonus_amount());
}

#[traced_test]
#[tokio::test]
async fn failed_leave_steps_are_logged_and_swallowed() {
    let (store, tracker, stream) = setup();
    let session = tracker.join(&stream, None, None).await.unwrap();

    // Both the mark and the decrement fail.
    store.fail_next(2);
    tracker.leave(&session.session_id, &stream).await.unwrap();

    assert!(logs_contain("failed to mark session as left"));
    assert!(logs_contain("failed to decrement viewer count"));
    assert!(logs_contain("error=presence operation failed (unavailable)"));

    // The count drifted high: nothing reconciles it.
    assert_eq!(
        tracker.counters(&stream).await.unwrap(),
        StreamCounters {
            current_viewers: 1,
            total_views: 1
        }
    );
}

#[traced_test]
#[tokio::test]
async fn counter_reads_propagate_transient_failures() {
    let (store, tracker, stream) = setup();
    store.fail_next(1);

    assert!(tracker.counters(&stream).await.unwrap_err().is_transient());
    tracker.counters(&stream).await.unwrap();
}

#[traced_test]
#[tokio::test]
async fn permanent_increment_failure_propagates_after_insert() {
    let (store, tracker, stream) = setup();

    store.fail_after_with(1, 1, ErrorKind::Store);
    let error = tracker.join(&stream, None, None).await.unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Store);
    assert!(!logs_contain("failed to increment viewer count"));
    assert_eq!(store.sessions(&stream).len(), 1);
    assert_eq!(tracker.counters(&stream).await.unwrap(), StreamCounters::default());
}
