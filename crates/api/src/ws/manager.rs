//! Per-job WebSocket observer registry.
//!
//! The registry maps a job id to its current set of observer channels.
//! Delivery to one observer never affects the others: a send failure just
//! evicts that observer. Completion is terminal — it delivers the final
//! message, closes every observer channel, and removes the job's entry so
//! no further broadcasts are possible for that job.

use std::collections::HashMap;

use axum::extract::ws::Message;
use tempero_core::types::DbId;
use tokio::sync::{mpsc, RwLock};

/// Channel sender half for pushing messages to one observer connection.
pub type ObserverSender = mpsc::UnboundedSender<Message>;

/// Manages all live job observers.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the application. Per-job delivery order matches call
/// order because all broadcasts flow through the single event router task.
pub struct JobWatchManager {
    jobs: RwLock<HashMap<DbId, HashMap<String, ObserverSender>>>,
}

impl JobWatchManager {
    /// Create a new, empty registry.
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Register an observer under a job id.
    ///
    /// Returns the receiver half of the observer's message channel so the
    /// caller can forward messages to the WebSocket sink.
    pub async fn attach(
        &self,
        job_id: DbId,
        observer_id: String,
    ) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.jobs
            .write()
            .await
            .entry(job_id)
            .or_default()
            .insert(observer_id, tx);
        rx
    }

    /// Remove one observer. Removing the last observer of a job removes
    /// the job's registry entry entirely — no leaked empty sets.
    pub async fn detach(&self, job_id: DbId, observer_id: &str) {
        let mut jobs = self.jobs.write().await;
        if let Some(observers) = jobs.get_mut(&job_id) {
            observers.remove(observer_id);
            if observers.is_empty() {
                jobs.remove(&job_id);
            }
        }
    }

    /// Send a message to a single observer. Returns `false` if the
    /// observer is no longer registered or its channel is closed.
    pub async fn send_to(&self, job_id: DbId, observer_id: &str, message: Message) -> bool {
        let jobs = self.jobs.read().await;
        jobs.get(&job_id)
            .and_then(|observers| observers.get(observer_id))
            .is_some_and(|tx| tx.send(message).is_ok())
    }

    /// Deliver one message to every observer of a job.
    ///
    /// Observers whose channels are closed are evicted; delivery to the
    /// rest is unaffected. Returns the number of observers reached.
    pub async fn broadcast_entry(&self, job_id: DbId, message: Message) -> usize {
        let mut jobs = self.jobs.write().await;
        let Some(observers) = jobs.get_mut(&job_id) else {
            return 0;
        };

        observers.retain(|_, tx| tx.send(message.clone()).is_ok());
        let delivered = observers.len();
        if observers.is_empty() {
            jobs.remove(&job_id);
        }
        delivered
    }

    /// Deliver the final message to every observer of a job, then close
    /// each of their channels and drop the job's registry entry. After
    /// this call no further broadcasts are possible for the job.
    pub async fn broadcast_completion(&self, job_id: DbId, message: Message) -> usize {
        let Some(observers) = self.jobs.write().await.remove(&job_id) else {
            return 0;
        };

        let mut delivered = 0;
        for tx in observers.values() {
            if tx.send(message.clone()).is_ok() {
                let _ = tx.send(Message::Close(None));
                delivered += 1;
            }
        }
        delivered
    }

    /// Number of observers currently attached to a job.
    pub async fn observer_count(&self, job_id: DbId) -> usize {
        self.jobs
            .read()
            .await
            .get(&job_id)
            .map_or(0, HashMap::len)
    }

    /// Number of jobs with at least one observer.
    pub async fn watched_job_count(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Send a Close frame to every observer of every job, then clear the
    /// registry. Used during graceful shutdown.
    pub async fn shutdown_all(&self) {
        let mut jobs = self.jobs.write().await;
        let count: usize = jobs.values().map(HashMap::len).sum();
        for observers in jobs.values() {
            for tx in observers.values() {
                let _ = tx.send(Message::Close(None));
            }
        }
        jobs.clear();
        tracing::info!(count, "Closed all job observer connections");
    }
}

impl Default for JobWatchManager {
    fn default() -> Self {
        Self::new()
    }
}
