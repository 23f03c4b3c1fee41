//! Handler for the `/catalog` resource: the spice labels a user may
//! assign to reservoir slots.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use tempero_core::catalog;
use tempero_db::repositories::RecipeRepo;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/catalog
///
/// The default spice list plus every label used in the caller's recipes.
pub async fn list_catalog(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let recipe_labels =
        RecipeRepo::ingredient_labels_for_user(&state.pool, auth.user_id).await?;
    let labels = catalog::catalog_for(&recipe_labels);
    Ok(Json(DataResponse { data: labels }))
}
