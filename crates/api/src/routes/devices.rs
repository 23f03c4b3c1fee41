//! Route definitions for the `/devices` resource.
//!
//! `/claim` is public (a factory-fresh device has no credential yet); the
//! `/me/*` endpoints require a device credential; the rest require a user
//! token.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{device_jobs, devices};
use crate::state::AppState;

/// Routes mounted at `/devices`.
///
/// ```text
/// GET    /                        -> list_devices (user)
/// POST   /claims                  -> create_claim (user)
/// POST   /claim                   -> redeem_claim (public, device)
/// POST   /me/heartbeat            -> heartbeat (device)
/// GET    /me/jobs/next            -> next_job (device)
/// POST   /me/jobs/{id}/report     -> report_item (device)
/// POST   /me/jobs/{id}/complete   -> complete_job (device)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(devices::list_devices))
        .route("/claims", post(devices::create_claim))
        .route("/claim", post(devices::redeem_claim))
        .route("/me/heartbeat", post(devices::heartbeat))
        .route("/me/jobs/next", get(device_jobs::next_job))
        .route("/me/jobs/{id}/report", post(device_jobs::report_item))
        .route("/me/jobs/{id}/complete", post(device_jobs::complete_job))
}
