//! Integration tests for detached broadcasts

#![allow(clippy::unwrap_used)]

mod support;

use std::{sync::Arc, time::Duration};

use pretty_assertions::assert_eq;
use pushcast_common::MessageContent;
use pushcast_delivery::{DeferredConfig, DeferredSupervisor};
use pushcast_store::HistoryStore;
use support::{Harness, Script, message};
use tokio::runtime::Handle;

const WAIT: Duration = Duration::from_secs(5);

fn supervisor(harness: &Harness, max_in_flight: usize) -> DeferredSupervisor {
    DeferredSupervisor::new(
        Arc::clone(&harness.orchestrator),
        DeferredConfig {
            max_in_flight,
            shutdown_timeout_secs: 5,
        },
        Handle::current(),
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_message_id_returned_before_delivery() {
    let harness = Harness::new();
    harness.register("d1", &["A", "B", "C"]).await;
    harness.provider.script("B", Script::Invalid);
    harness.provider.hold();

    let supervisor = supervisor(&harness, 4);
    let message_id = supervisor.broadcast_deferred("d1", message()).unwrap();

    // Nothing can finish while sends are held
    assert_eq!(supervisor.in_flight(), 1);
    assert_eq!(
        harness.orchestrator.message_stats("d1", message_id).await.unwrap(),
        None
    );

    harness.provider.release();
    let stats = harness.stats.wait_for_stats(message_id, WAIT).await.unwrap();
    assert_eq!((stats.sent, stats.delivered, stats.not_delivered), (3, 2, 1));

    assert!(supervisor.drain(WAIT).await);
    assert_eq!(supervisor.in_flight(), 0);
    assert_eq!(harness.history.events_for(message_id).await.unwrap().len(), 3);
    assert_eq!(harness.tokens("d1").await, vec!["A", "C"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_invalid_request_is_rejected_up_front() {
    let harness = Harness::new();
    let supervisor = supervisor(&harness, 4);

    let err = supervisor
        .broadcast_deferred("", MessageContent::new("title", "body"))
        .unwrap_err();

    assert!(err.is_client_error());
    assert_eq!(supervisor.in_flight(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_background_failure_is_published() {
    let harness = Harness::new();
    harness.register("d1", &["A"]).await;
    harness.contacts.fail_reads(true);

    let supervisor = supervisor(&harness, 4);
    let mut failures = supervisor.subscribe_failures();

    let message_id = supervisor.broadcast_deferred("d1", message()).unwrap();

    let failure = tokio::time::timeout(WAIT, failures.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(failure.message_id, message_id);
    assert_eq!(failure.domain, "d1");
    assert!(failure.error.contains("d1"));

    assert!(supervisor.drain(WAIT).await);
    assert_eq!(
        harness.orchestrator.message_stats("d1", message_id).await.unwrap(),
        None
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_caller_going_away_does_not_cancel() {
    let harness = Harness::new();
    harness.register("d1", &["A", "B"]).await;
    harness.provider.hold();

    let supervisor = Arc::new(supervisor(&harness, 4));
    let caller = {
        let supervisor = Arc::clone(&supervisor);
        tokio::spawn(async move { supervisor.broadcast_deferred("d1", message()).unwrap() })
    };
    let message_id = caller.await.unwrap();

    harness.provider.release();
    let stats = harness.stats.wait_for_stats(message_id, WAIT).await.unwrap();
    assert_eq!(stats.delivered, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_in_flight_limit_queues_extra_requests() {
    let harness = Harness::new();
    harness.register("d1", &["A"]).await;
    harness.provider.hold();

    let supervisor = supervisor(&harness, 1);
    let first = supervisor.broadcast_deferred("d1", message()).unwrap();
    let second = supervisor.broadcast_deferred("d1", message()).unwrap();
    assert_ne!(first, second);
    assert_eq!(supervisor.in_flight(), 2);

    // Give the runtime time to start whatever it is allowed to
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(harness.provider.titles().len(), 1);

    harness.provider.release();
    harness.stats.wait_for_stats(first, WAIT).await.unwrap();
    harness.stats.wait_for_stats(second, WAIT).await.unwrap();
    assert!(supervisor.drain(WAIT).await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_drain_times_out_while_work_is_held() {
    let harness = Harness::new();
    harness.register("d1", &["A"]).await;
    harness.provider.hold();

    let supervisor = supervisor(&harness, 4);
    supervisor.broadcast_deferred("d1", message()).unwrap();

    assert!(!supervisor.drain(Duration::from_millis(50)).await);
    assert_eq!(supervisor.in_flight(), 1);

    harness.provider.release();
    assert!(supervisor.shutdown().await);
}
