pub mod auth;
pub mod catalog;
pub mod devices;
pub mod health;
pub mod jobs;
pub mod recipes;
pub mod reservoirs;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/register                                   register (public)
/// /auth/login                                      login (public)
///
/// /recipes                                         list, create
/// /recipes/{id}                                    get, update, delete
///
/// /catalog                                         spice labels
///
/// /reservoirs                                      list, bulk configure
/// /reservoirs/{slot}                               configure one slot
///
/// /jobs                                            list, create
/// /jobs/active                                     the active job
/// /jobs/cancel                                     cancel active jobs
/// /jobs/{id}                                       get
///
/// /devices                                         list (user)
/// /devices/claims                                  issue claim code (user)
/// /devices/claim                                   redeem claim code (public)
/// /devices/me/heartbeat                            heartbeat (device)
/// /devices/me/jobs/next                            next job poll (device)
/// /devices/me/jobs/{id}/report                     incremental report (device)
/// /devices/me/jobs/{id}/complete                   terminal completion (device)
///
/// /ws/jobs/{id}                                    observer WebSocket
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/recipes", recipes::router())
        .nest("/catalog", catalog::router())
        .nest("/reservoirs", reservoirs::router())
        .nest("/jobs", jobs::router())
        .nest("/devices", devices::router())
        .route("/ws/jobs/{id}", get(ws::watch_job))
}
