//! Route definitions for the user-facing `/jobs` resource.
//!
//! All endpoints require a user token. Devices interact with jobs through
//! the `/devices/me/jobs/*` endpoints instead.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// Routes mounted at `/jobs`.
///
/// ```text
/// GET    /                -> list_jobs
/// POST   /                -> create_job
/// GET    /active          -> active_job
/// POST   /cancel          -> cancel_jobs
/// GET    /{id}            -> get_job
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(jobs::list_jobs).post(jobs::create_job))
        .route("/active", get(jobs::active_job))
        .route("/cancel", post(jobs::cancel_jobs))
        .route("/{id}", get(jobs::get_job))
}
