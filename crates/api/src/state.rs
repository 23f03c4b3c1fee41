use std::sync::Arc;

use crate::config::ServerConfig;
use crate::ws::JobWatchManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: tempero_db::DbPool,
    /// Server configuration (JWT secret, CORS, timeouts).
    pub config: Arc<ServerConfig>,
    /// Per-job WebSocket observer registry.
    pub watch_manager: Arc<JobWatchManager>,
    /// Execution event bus; handlers publish, the router task fans out.
    pub event_bus: Arc<tempero_events::EventBus>,
}
