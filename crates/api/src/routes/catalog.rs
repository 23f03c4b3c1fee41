//! Route definition for the `/catalog` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::catalog;
use crate::state::AppState;

/// Routes mounted at `/catalog`.
///
/// ```text
/// GET    /                -> list_catalog
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(catalog::list_catalog))
}
