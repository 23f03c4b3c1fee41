//! Unit tests for `JobWatchManager` and the event router.
//!
//! These tests exercise the per-job observer registry directly, without
//! performing any HTTP upgrades. They verify attach/detach semantics,
//! broadcast delivery and isolation, completion teardown, and that the
//! router task preserves per-observer ordering.

use std::sync::Arc;

use assert_matches::assert_matches;
use axum::extract::ws::Message;
use tempero_api::notifications::JobEventRouter;
use tempero_api::ws::JobWatchManager;
use tempero_events::{EventBus, ExecutionEvent};

// ---------------------------------------------------------------------------
// Test: new manager starts empty
// ---------------------------------------------------------------------------

#[tokio::test]
async fn new_manager_watches_no_jobs() {
    let manager = JobWatchManager::new();

    assert_eq!(manager.watched_job_count().await, 0);
    assert_eq!(manager.observer_count(1).await, 0);
}

// ---------------------------------------------------------------------------
// Test: attach() registers observers per job
// ---------------------------------------------------------------------------

#[tokio::test]
async fn attach_registers_observers_per_job() {
    let manager = JobWatchManager::new();

    let _rx1 = manager.attach(1, "obs-1".to_string()).await;
    let _rx2 = manager.attach(1, "obs-2".to_string()).await;
    let _rx3 = manager.attach(2, "obs-3".to_string()).await;

    assert_eq!(manager.observer_count(1).await, 2);
    assert_eq!(manager.observer_count(2).await, 1);
    assert_eq!(manager.watched_job_count().await, 2);
}

// ---------------------------------------------------------------------------
// Test: detach() removes one observer; the last removal drops the entry
// ---------------------------------------------------------------------------

#[tokio::test]
async fn detach_removes_observer_and_empty_entry() {
    let manager = JobWatchManager::new();

    let _rx1 = manager.attach(1, "obs-1".to_string()).await;
    let _rx2 = manager.attach(1, "obs-2".to_string()).await;

    manager.detach(1, "obs-1").await;
    assert_eq!(manager.observer_count(1).await, 1);
    assert_eq!(manager.watched_job_count().await, 1);

    // Removing the last observer removes the job entry — no leaked empty sets.
    manager.detach(1, "obs-2").await;
    assert_eq!(manager.observer_count(1).await, 0);
    assert_eq!(manager.watched_job_count().await, 0);
}

// ---------------------------------------------------------------------------
// Test: detach() with unknown ids is a no-op
// ---------------------------------------------------------------------------

#[tokio::test]
async fn detach_unknown_observer_is_noop() {
    let manager = JobWatchManager::new();

    let _rx = manager.attach(1, "obs-1".to_string()).await;
    manager.detach(1, "nonexistent").await;
    manager.detach(99, "obs-1").await;

    assert_eq!(manager.observer_count(1).await, 1);
}

// ---------------------------------------------------------------------------
// Test: broadcast_entry() reaches every observer of that job only
// ---------------------------------------------------------------------------

#[tokio::test]
async fn broadcast_entry_reaches_only_that_jobs_observers() {
    let manager = JobWatchManager::new();

    let mut rx1 = manager.attach(1, "obs-1".to_string()).await;
    let mut rx2 = manager.attach(1, "obs-2".to_string()).await;
    let mut rx3 = manager.attach(2, "obs-3".to_string()).await;

    let delivered = manager
        .broadcast_entry(1, Message::Text("entry".into()))
        .await;
    assert_eq!(delivered, 2);

    let msg1 = rx1.recv().await.expect("rx1 should receive the entry");
    let msg2 = rx2.recv().await.expect("rx2 should receive the entry");
    assert!(matches!(&msg1, Message::Text(t) if *t == "entry"));
    assert!(matches!(&msg2, Message::Text(t) if *t == "entry"));

    // The other job's observer must not see anything.
    assert!(rx3.try_recv().is_err());
}

// ---------------------------------------------------------------------------
// Test: a failed observer is evicted without affecting the others
// ---------------------------------------------------------------------------

#[tokio::test]
async fn broadcast_entry_evicts_closed_observer() {
    let manager = JobWatchManager::new();

    let rx1 = manager.attach(1, "obs-1".to_string()).await;
    let mut rx2 = manager.attach(1, "obs-2".to_string()).await;

    // Drop rx1 to close its channel.
    drop(rx1);

    let delivered = manager
        .broadcast_entry(1, Message::Text("still alive".into()))
        .await;
    assert_eq!(delivered, 1);

    // obs-2 still receives; obs-1 was removed from the registry.
    let msg = rx2.recv().await.expect("rx2 should receive the entry");
    assert!(matches!(&msg, Message::Text(t) if *t == "still alive"));
    assert_eq!(manager.observer_count(1).await, 1);
}

// ---------------------------------------------------------------------------
// Test: broadcast to a job with no observers delivers to nobody
// ---------------------------------------------------------------------------

#[tokio::test]
async fn broadcast_without_observers_is_harmless() {
    let manager = JobWatchManager::new();

    let delivered = manager
        .broadcast_entry(42, Message::Text("void".into()))
        .await;
    assert_eq!(delivered, 0);

    let delivered = manager
        .broadcast_completion(42, Message::Text("void".into()))
        .await;
    assert_eq!(delivered, 0);
}

// ---------------------------------------------------------------------------
// Test: broadcast_completion() sends final message + Close and tears down
// ---------------------------------------------------------------------------

#[tokio::test]
async fn completion_sends_final_message_then_close_and_removes_entry() {
    let manager = JobWatchManager::new();

    let mut rx1 = manager.attach(1, "obs-1".to_string()).await;
    let mut rx2 = manager.attach(1, "obs-2".to_string()).await;

    let delivered = manager
        .broadcast_completion(1, Message::Text("complete".into()))
        .await;
    assert_eq!(delivered, 2);

    for rx in [&mut rx1, &mut rx2] {
        let msg = rx.recv().await.expect("should receive completion");
        assert!(matches!(&msg, Message::Text(t) if *t == "complete"));

        let close = rx.recv().await.expect("should receive Close");
        assert_matches!(close, Message::Close(None));

        // Sender dropped with the registry entry: channel is closed.
        assert!(rx.recv().await.is_none());
    }

    // The registry entry is gone; no further broadcasts are possible.
    assert_eq!(manager.watched_job_count().await, 0);
    let delivered = manager
        .broadcast_entry(1, Message::Text("late".into()))
        .await;
    assert_eq!(delivered, 0);
}

// ---------------------------------------------------------------------------
// Test: send_to() targets a single observer
// ---------------------------------------------------------------------------

#[tokio::test]
async fn send_to_reaches_one_observer() {
    let manager = JobWatchManager::new();

    let mut rx1 = manager.attach(1, "obs-1".to_string()).await;
    let mut rx2 = manager.attach(1, "obs-2".to_string()).await;

    assert!(manager.send_to(1, "obs-1", Message::Text("pong".into())).await);
    assert!(!manager.send_to(1, "ghost", Message::Text("pong".into())).await);

    let msg = rx1.recv().await.expect("rx1 should receive");
    assert!(matches!(&msg, Message::Text(t) if *t == "pong"));
    assert!(rx2.try_recv().is_err());
}

// ---------------------------------------------------------------------------
// Test: shutdown_all() closes every observer and clears the registry
// ---------------------------------------------------------------------------

#[tokio::test]
async fn shutdown_all_closes_and_clears() {
    let manager = JobWatchManager::new();

    let mut rx1 = manager.attach(1, "obs-1".to_string()).await;
    let mut rx2 = manager.attach(2, "obs-2".to_string()).await;

    manager.shutdown_all().await;

    assert_eq!(manager.watched_job_count().await, 0);
    assert_matches!(rx1.recv().await, Some(Message::Close(None)));
    assert_matches!(rx2.recv().await, Some(Message::Close(None)));
}

// ---------------------------------------------------------------------------
// Test: the router preserves publish order per observer
// ---------------------------------------------------------------------------

#[tokio::test]
async fn router_delivers_events_in_publish_order() {
    let manager = Arc::new(JobWatchManager::new());
    let bus = EventBus::default();

    let mut rx = manager.attach(7, "obs-1".to_string()).await;

    let router = JobEventRouter::new(Arc::clone(&manager));
    let handle = tokio::spawn(router.run(bus.subscribe()));

    for sequence in 1..=3 {
        bus.publish(ExecutionEvent::log_entry(
            7,
            serde_json::json!({ "sequence": sequence }),
        ));
    }
    bus.publish(ExecutionEvent::completion(7, serde_json::json!({"ok": true})));

    // Entries arrive in publish order, then the completion, then Close.
    for sequence in 1..=3 {
        let msg = rx.recv().await.expect("should receive log entry");
        let Message::Text(text) = msg else {
            panic!("expected text frame, got {msg:?}");
        };
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "execution_log_entry");
        assert_eq!(value["data"]["sequence"], sequence);
        assert!(value["timestamp"].is_string());
    }

    let msg = rx.recv().await.expect("should receive completion");
    let Message::Text(text) = msg else {
        panic!("expected text frame, got {msg:?}");
    };
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["type"], "execution_complete");

    assert_matches!(rx.recv().await, Some(Message::Close(None)));
    assert!(rx.recv().await.is_none());

    // Closing the bus stops the router task.
    drop(bus);
    handle.await.expect("router task should exit cleanly");
}
