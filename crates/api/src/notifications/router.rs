//! Event-to-observer routing task.
//!
//! [`JobEventRouter`] subscribes to the execution event bus and relays
//! each event to the WebSocket observers of the affected job. All
//! broadcasts flow through this single task, which is what guarantees
//! per-observer delivery order matches publish order.

use std::sync::Arc;

use axum::extract::ws::Message;
use serde_json::json;
use tokio::sync::broadcast;
use tempero_events::ExecutionEvent;

use crate::ws::JobWatchManager;

/// Routes execution events to job observers.
pub struct JobEventRouter {
    watch: Arc<JobWatchManager>,
}

impl JobEventRouter {
    /// Create a new router over the given observer registry.
    pub fn new(watch: Arc<JobWatchManager>) -> Self {
        Self { watch }
    }

    /// Run the main routing loop.
    ///
    /// Consumes events from the bus until the channel is closed (i.e. the
    /// [`EventBus`](tempero_events::EventBus) is dropped at shutdown).
    pub async fn run(self, mut receiver: broadcast::Receiver<ExecutionEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => self.route_event(event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Job event router lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, job event router shutting down");
                    break;
                }
            }
        }
    }

    /// Relay one event to the observers of its job. Delivery is
    /// best-effort; failures only evict the affected observer.
    async fn route_event(&self, event: ExecutionEvent) {
        let message = Message::Text(
            json!({
                "type": event.event_type,
                "data": event.payload,
                "timestamp": event.timestamp,
            })
            .to_string()
            .into(),
        );

        let delivered = if event.is_completion() {
            self.watch
                .broadcast_completion(event.job_id, message)
                .await
        } else {
            self.watch.broadcast_entry(event.job_id, message).await
        };

        tracing::debug!(
            job_id = event.job_id,
            event_type = %event.event_type,
            delivered,
            "Routed execution event",
        );
    }
}
