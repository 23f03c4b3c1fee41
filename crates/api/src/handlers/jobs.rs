//! Handlers for the user-facing `/jobs` resource.
//!
//! Job creation runs the full admission sequence: single-active-job check,
//! recipe ownership, portion precondition, reservoir resolution, and the
//! non-destructive stock pre-check — all before anything is persisted.
//! Stock is never deducted here; that happens only on confirmed
//! completion.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use tempero_core::error::CoreError;
use tempero_core::resolver::{self, IngredientSpec};
use tempero_core::types::DbId;
use tempero_db::models::job::{CreateJob, JobDetail};
use tempero_db::repositories::{JobRepo, RecipeRepo, ReservoirRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Fixed message recorded on jobs canceled by their owner.
const OPERATOR_CANCEL_MESSAGE: &str = "Canceled by operator request";

/// Page size for the job history listing.
const RECENT_JOBS_LIMIT: i64 = 50;

/// Response for `POST /jobs/cancel`.
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    /// How many active jobs were flipped to canceled (0 or 1 under the
    /// single-active-job invariant).
    pub canceled: u64,
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs
///
/// Create a job from a recipe for a requested serving count. Rejections,
/// in order: active job exists (409), recipe missing/not owned (404),
/// recipe without portions (422), unmapped or uncalibrated labels (409
/// with the offending labels), insufficient known stock (409 naming the
/// slot and grams). Returns 201 with the job and its items.
pub async fn create_job(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateJob>,
) -> AppResult<impl IntoResponse> {
    // 1. One active job per user. The uq_jobs_user_active index closes
    //    the race if two creations pass this check concurrently.
    if JobRepo::find_active_by_user(&state.pool, auth.user_id)
        .await?
        .is_some()
    {
        return Err(AppError::Core(CoreError::Conflict(
            "An active job already exists for this user".into(),
        )));
    }

    // 2. Recipe must exist and belong to the caller.
    let recipe = RecipeRepo::find_by_id(&state.pool, input.recipe_id)
        .await?
        .filter(|r| r.user_id == auth.user_id)
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Recipe",
            id: input.recipe_id,
        }))?;

    // 3. Portion precondition.
    if recipe.portions <= 0 {
        return Err(AppError::Core(CoreError::InvalidState(
            "Recipe has no positive portion count".into(),
        )));
    }

    let servings = input.effective_servings();
    if servings < 1 {
        return Err(AppError::Core(CoreError::Validation(
            "Requested servings must be at least 1".into(),
        )));
    }

    // 4. Resolve every ingredient to a calibrated reservoir.
    let ingredients: Vec<IngredientSpec> = RecipeRepo::ingredients_for(&state.pool, recipe.id)
        .await?
        .into_iter()
        .map(|i| IngredientSpec {
            label: i.label,
            quantity_grams: f64::from(i.quantity_grams),
        })
        .collect();

    let configs: Vec<_> = ReservoirRepo::list_by_user(&state.pool, auth.user_id)
        .await?
        .iter()
        .map(|c| c.to_slot_config())
        .collect();

    let resolution = resolver::resolve(&configs, &ingredients, servings, recipe.portions)
        .map_err(AppError::Core)?;

    // Missing takes priority: when any label has no reservoir at all, do
    // not also report calibration gaps for the same run.
    if !resolution.missing.is_empty() {
        return Err(AppError::Core(CoreError::ReservoirMapping {
            missing: resolution.missing,
            uncalibrated: Vec::new(),
        }));
    }
    if !resolution.uncalibrated.is_empty() {
        return Err(AppError::Core(CoreError::ReservoirMapping {
            missing: Vec::new(),
            uncalibrated: resolution.uncalibrated,
        }));
    }

    // 5. Non-destructive stock pre-check over aggregate consumption.
    //    Unknown stock never blocks.
    let required = resolver::aggregate_required(&resolution.resolved);
    for (slot, needed) in &required {
        let available = configs
            .iter()
            .find(|c| c.slot == *slot)
            .and_then(|c| c.stock_grams);
        if let Some(available) = available {
            if available < *needed {
                return Err(AppError::Core(CoreError::InsufficientStock {
                    slot: *slot,
                    required_g: *needed,
                    available_g: available,
                }));
            }
        }
    }

    // 6. Persist job + items in one transaction; stock untouched.
    let job = JobRepo::create_with_items(
        &state.pool,
        auth.user_id,
        recipe.id,
        servings,
        &resolution.resolved,
    )
    .await?;
    let items = JobRepo::items_for(&state.pool, job.id).await?;

    tracing::info!(
        job_id = job.id,
        user_id = auth.user_id,
        recipe_id = recipe.id,
        servings,
        items = items.len(),
        "Job created",
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: JobDetail { job, items },
        }),
    ))
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

/// GET /api/v1/jobs
///
/// The caller's recent jobs, newest first.
pub async fn list_jobs(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let jobs = JobRepo::list_by_user(&state.pool, auth.user_id, RECENT_JOBS_LIMIT).await?;
    Ok(Json(DataResponse { data: jobs }))
}

/// GET /api/v1/jobs/active
///
/// The caller's single queued/running job, or `null`.
pub async fn active_job(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let job = JobRepo::find_active_by_user(&state.pool, auth.user_id).await?;

    let detail = match job {
        Some(job) => {
            let items = JobRepo::items_for(&state.pool, job.id).await?;
            Some(JobDetail { job, items })
        }
        None => None,
    };

    Ok(Json(DataResponse { data: detail }))
}

/// GET /api/v1/jobs/{id}
pub async fn get_job(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = JobRepo::find_by_id(&state.pool, job_id)
        .await?
        .filter(|j| j.user_id == auth.user_id)
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Job",
            id: job_id,
        }))?;

    let items = JobRepo::items_for(&state.pool, job.id).await?;
    Ok(Json(DataResponse {
        data: JobDetail { job, items },
    }))
}

// ---------------------------------------------------------------------------
// Cancel
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs/cancel
///
/// Flip every active job of the caller to canceled. Best-effort: a device
/// mid-execution is not interrupted; cancellation prevents new pickup and
/// tells observers the job is no longer authoritative.
pub async fn cancel_jobs(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let canceled =
        JobRepo::cancel_active(&state.pool, auth.user_id, OPERATOR_CANCEL_MESSAGE).await?;

    tracing::info!(user_id = auth.user_id, canceled, "Jobs canceled");

    Ok(Json(DataResponse {
        data: CancelResponse { canceled },
    }))
}
