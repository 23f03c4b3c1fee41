//! Route definitions for the `/reservoirs` resource.
//!
//! All endpoints require a user token.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::reservoirs;
use crate::state::AppState;

/// Routes mounted at `/reservoirs`.
///
/// ```text
/// GET    /                -> list_reservoirs
/// PUT    /                -> upsert_reservoirs (bulk)
/// PUT    /{slot}          -> upsert_reservoir
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(reservoirs::list_reservoirs).put(reservoirs::upsert_reservoirs),
        )
        .route("/{slot}", put(reservoirs::upsert_reservoir))
}
