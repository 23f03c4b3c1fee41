//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`ExecutionEvent`]s. It is
//! designed to be shared via `Arc<EventBus>` across the application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tempero_core::types::DbId;

/// Wire event kind for one execution log entry.
pub const EVENT_EXECUTION_LOG_ENTRY: &str = "execution_log_entry";

/// Wire event kind for the final completion message of a job.
pub const EVENT_EXECUTION_COMPLETE: &str = "execution_complete";

// ---------------------------------------------------------------------------
// ExecutionEvent
// ---------------------------------------------------------------------------

/// One observable step of a job's execution.
///
/// `event_type` doubles as the `type` field of the WebSocket message sent
/// to observers; `payload` becomes its `data` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionEvent {
    /// Event kind: [`EVENT_EXECUTION_LOG_ENTRY`] or
    /// [`EVENT_EXECUTION_COMPLETE`].
    pub event_type: String,

    /// The job this event belongs to. Observers are registered per job id.
    pub job_id: DbId,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    /// Server-side timestamp stamped at publish time (UTC).
    pub timestamp: DateTime<Utc>,
}

impl ExecutionEvent {
    /// Build a log-entry event for one reported execution step.
    pub fn log_entry(job_id: DbId, payload: serde_json::Value) -> Self {
        Self {
            event_type: EVENT_EXECUTION_LOG_ENTRY.to_string(),
            job_id,
            payload,
            timestamp: Utc::now(),
        }
    }

    /// Build the final completion event for a job.
    pub fn completion(job_id: DbId, payload: serde_json::Value) -> Self {
        Self {
            event_type: EVENT_EXECUTION_COMPLETE.to_string(),
            job_id,
            payload,
            timestamp: Utc::now(),
        }
    }

    /// Whether this event terminates the job's broadcast stream.
    pub fn is_completion(&self) -> bool {
        self.event_type == EVENT_EXECUTION_COMPLETE
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`ExecutionEvent`].
pub struct EventBus {
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped —
    /// broadcasting is best-effort by design.
    pub fn publish(&self, event: ExecutionEvent) {
        // Ignore the SendError — it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(ExecutionEvent::log_entry(
            42,
            serde_json::json!({"reservoir_slot": 1, "status": "done"}),
        ));

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.event_type, EVENT_EXECUTION_LOG_ENTRY);
        assert_eq!(received.job_id, 42);
        assert_eq!(received.payload["reservoir_slot"], 1);
        assert!(!received.is_completion());
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(ExecutionEvent::completion(7, serde_json::json!({"ok": true})));

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");

        assert!(e1.is_completion());
        assert!(e2.is_completion());
        assert_eq!(e1.job_id, 7);
        assert_eq!(e2.job_id, 7);
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        // No subscribers — this must not panic.
        bus.publish(ExecutionEvent::log_entry(1, serde_json::Value::Null));
    }
}
