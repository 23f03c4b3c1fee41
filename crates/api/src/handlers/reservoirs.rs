//! Handlers for the `/reservoirs` resource.
//!
//! A reservoir label must come from the user's spice catalog (or be null
//! to mark the slot empty). Bulk updates reject duplicate slot numbers in
//! one payload before anything is written.

use std::collections::HashSet;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use tempero_core::catalog;
use tempero_core::error::CoreError;
use tempero_db::models::reservoir::{UpsertReservoir, UpsertReservoirSlot};
use tempero_db::repositories::{RecipeRepo, ReservoirRepo};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Reject a label that is not in the caller's spice catalog.
async fn check_label(
    state: &AppState,
    user_id: tempero_core::types::DbId,
    label: Option<&str>,
) -> AppResult<()> {
    let Some(label) = label else {
        return Ok(());
    };

    let recipe_labels = RecipeRepo::ingredient_labels_for_user(&state.pool, user_id).await?;
    let known = catalog::catalog_for(&recipe_labels);
    if !catalog::label_in_catalog(&known, label) {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Label '{label}' is not in the spice catalog"
        ))));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/reservoirs
///
/// The caller's configured slots, in slot order.
pub async fn list_reservoirs(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let configs = ReservoirRepo::list_by_user(&state.pool, auth.user_id).await?;
    Ok(Json(DataResponse { data: configs }))
}

/// PUT /api/v1/reservoirs/{slot}
///
/// Create or replace the configuration of one slot.
pub async fn upsert_reservoir(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(slot): Path<i16>,
    Json(input): Json<UpsertReservoir>,
) -> AppResult<impl IntoResponse> {
    if !(1..=4).contains(&slot) {
        return Err(AppError::Core(CoreError::Validation(
            "Reservoir slot must be between 1 and 4".into(),
        )));
    }
    input
        .validate()
        .map_err(|e| AppError::Core(CoreError::Validation(e.to_string())))?;
    check_label(&state, auth.user_id, input.label.as_deref()).await?;

    let config = ReservoirRepo::upsert(&state.pool, auth.user_id, slot, &input).await?;

    tracing::info!(user_id = auth.user_id, slot, "Reservoir slot configured");

    Ok(Json(DataResponse { data: config }))
}

/// PUT /api/v1/reservoirs
///
/// Configure several slots in one transaction. A duplicate slot number in
/// the payload is a conflict; nothing is written in that case.
pub async fn upsert_reservoirs(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<Vec<UpsertReservoirSlot>>,
) -> AppResult<impl IntoResponse> {
    let mut seen = HashSet::new();
    for entry in &input {
        entry
            .validate()
            .map_err(|e| AppError::Core(CoreError::Validation(e.to_string())))?;
        if !seen.insert(entry.slot) {
            return Err(AppError::Core(CoreError::Conflict(format!(
                "Duplicate reservoir slot {} in update",
                entry.slot
            ))));
        }
        check_label(&state, auth.user_id, entry.config.label.as_deref()).await?;
    }

    let entries: Vec<(i16, &UpsertReservoir)> =
        input.iter().map(|e| (e.slot, &e.config)).collect();
    let configs = ReservoirRepo::upsert_many(&state.pool, auth.user_id, &entries).await?;

    tracing::info!(
        user_id = auth.user_id,
        slots = configs.len(),
        "Reservoir slots configured",
    );

    Ok(Json(DataResponse { data: configs }))
}
