//! Handlers for the `/recipes` resource.
//!
//! All endpoints require a user token. A recipe belongs to exactly one
//! user; cross-user access reads as 404 so recipe ids are not probeable.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tempero_core::error::CoreError;
use tempero_core::types::DbId;
use tempero_db::models::recipe::{CreateRecipe, Recipe, UpdateRecipe};
use tempero_db::repositories::RecipeRepo;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fetch a recipe by ID and verify the caller owns it. Not-owned reads as
/// `NotFound`.
async fn find_and_authorize(
    pool: &sqlx::PgPool,
    recipe_id: DbId,
    auth: &AuthUser,
) -> AppResult<Recipe> {
    let recipe = RecipeRepo::find_by_id(pool, recipe_id)
        .await?
        .filter(|r| r.user_id == auth.user_id)
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Recipe",
            id: recipe_id,
        }))?;
    Ok(recipe)
}

/// Map validator failures onto the domain validation error.
fn validated<T: Validate>(input: &T) -> AppResult<()> {
    input
        .validate()
        .map_err(|e| AppError::Core(CoreError::Validation(e.to_string())))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/recipes
///
/// Create a recipe with 1-4 ingredients. Returns 201 with the created
/// recipe and its ordered ingredient list.
pub async fn create_recipe(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateRecipe>,
) -> AppResult<impl IntoResponse> {
    validated(&input)?;

    let detail = RecipeRepo::create(&state.pool, auth.user_id, &input).await?;

    tracing::info!(
        recipe_id = detail.recipe.id,
        user_id = auth.user_id,
        ingredients = detail.ingredients.len(),
        "Recipe created",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: detail })))
}

/// GET /api/v1/recipes
///
/// List the caller's recipes with ingredients, newest first.
pub async fn list_recipes(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let recipes = RecipeRepo::list_by_user(&state.pool, auth.user_id).await?;
    Ok(Json(DataResponse { data: recipes }))
}

/// GET /api/v1/recipes/{id}
pub async fn get_recipe(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(recipe_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    find_and_authorize(&state.pool, recipe_id, &auth).await?;

    let detail = RecipeRepo::detail(&state.pool, recipe_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Recipe",
            id: recipe_id,
        }))?;

    Ok(Json(DataResponse { data: detail }))
}

/// PUT /api/v1/recipes/{id}
///
/// Update name/portions and optionally replace the ingredient list.
pub async fn update_recipe(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(recipe_id): Path<DbId>,
    Json(input): Json<UpdateRecipe>,
) -> AppResult<impl IntoResponse> {
    validated(&input)?;
    find_and_authorize(&state.pool, recipe_id, &auth).await?;

    let detail = RecipeRepo::update(&state.pool, recipe_id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Recipe",
            id: recipe_id,
        }))?;

    tracing::info!(recipe_id, user_id = auth.user_id, "Recipe updated");

    Ok(Json(DataResponse { data: detail }))
}

/// DELETE /api/v1/recipes/{id}
///
/// Delete a recipe. Existing jobs keep their items; their `recipe_id`
/// becomes NULL. Returns 204.
pub async fn delete_recipe(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(recipe_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    find_and_authorize(&state.pool, recipe_id, &auth).await?;

    RecipeRepo::delete(&state.pool, recipe_id).await?;

    tracing::info!(recipe_id, user_id = auth.user_id, "Recipe deleted");

    Ok(StatusCode::NO_CONTENT)
}
