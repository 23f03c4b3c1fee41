//! WebSocket infrastructure for live job observation.
//!
//! Provides the per-job observer registry, the HTTP upgrade handler used
//! by Axum routes, and re-exports for integration tests.

mod handler;
pub mod manager;

pub use handler::watch_job;
pub use manager::JobWatchManager;
