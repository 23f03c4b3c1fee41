//! Device-facing job endpoints: poll, incremental report, and the
//! terminal completion report.
//!
//! Devices execute offline-first: a dispenser may run the whole job
//! without connectivity and deliver a single completion report on
//! reconnection, possibly more than once. The completion path is the only
//! one that touches inventory, and it is idempotent: once the job is
//! terminal, every further report is acknowledged without mutation.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use serde_json::json;
use tempero_core::error::CoreError;
use tempero_core::settlement::ItemOutcome;
use tempero_core::types::DbId;
use tempero_db::models::job::{CompleteJobReport, ItemReport, Job, JobDetail};
use tempero_db::models::status::{JobItemStatus, JobStatus};
use tempero_db::repositories::{JobRepo, Settlement};
use tempero_events::ExecutionEvent;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthDevice;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Acknowledgment for the terminal completion report.
#[derive(Debug, Serialize)]
pub struct CompletionAck {
    /// True when the job was already terminal and this report was a
    /// duplicate; nothing was mutated in that case.
    pub already_completed: bool,
    pub status: &'static str,
    pub items_completed: Option<i32>,
    pub items_failed: Option<i32>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fetch a job and verify it belongs to the device's owning user.
async fn find_and_authorize(
    pool: &sqlx::PgPool,
    job_id: DbId,
    auth: &AuthDevice,
) -> AppResult<Job> {
    let job = JobRepo::find_by_id(pool, job_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Job",
            id: job_id,
        }))?;

    if job.user_id != auth.device.user_id {
        return Err(AppError::Core(CoreError::Forbidden(
            "Job does not belong to this device's owner".into(),
        )));
    }

    Ok(job)
}

/// Wire name for a job's status id, for responses and events.
fn status_name(status_id: i16) -> &'static str {
    JobStatus::from_id(status_id).map_or("unknown", JobStatus::name)
}

// ---------------------------------------------------------------------------
// Poll
// ---------------------------------------------------------------------------

/// GET /api/v1/devices/me/jobs/next
///
/// Hand out the oldest queued job of the device's owner, with its items;
/// at most one per poll, `null` when the queue is empty. The first
/// hand-out stamps `started_at`, but the status stays queued until the
/// device reports running — fully-offline executions only ever send the
/// final completion report.
pub async fn next_job(
    auth: AuthDevice,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let job = JobRepo::next_for_owner(&state.pool, auth.device.user_id).await?;

    let detail = match job {
        Some(job) => {
            tracing::info!(job_id = job.id, device_id = auth.device.id, "Job handed to device");
            let items = JobRepo::items_for(&state.pool, job.id).await?;
            Some(JobDetail { job, items })
        }
        None => None,
    };

    Ok(Json(DataResponse { data: detail }))
}

// ---------------------------------------------------------------------------
// Incremental report
// ---------------------------------------------------------------------------

/// POST /api/v1/devices/me/jobs/{id}/report
///
/// One per-item status update from a connected device. Flips the job to
/// running (stamping `started_at` once) and updates the item row, then
/// relays a live log entry to observers. Never settles the job and never
/// touches stock — the terminal completion report is the sole
/// stock-affecting settlement, so nothing here can double-deduct.
pub async fn report_item(
    auth: AuthDevice,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
    Json(input): Json<ItemReport>,
) -> AppResult<impl IntoResponse> {
    let job = find_and_authorize(&state.pool, job_id, &auth).await?;

    let terminal = JobStatus::from_id(job.status_id).is_some_and(JobStatus::is_terminal);
    if terminal {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Job is already {} and accepts no further reports",
            status_name(job.status_id)
        ))));
    }

    JobRepo::mark_running(&state.pool, job_id).await?;

    let updated = JobRepo::update_item_status(
        &state.pool,
        job_id,
        input.sequence,
        JobItemStatus::from(input.status),
        input.error.as_deref(),
    )
    .await?;

    if !updated {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Job {job_id} has no item with sequence {}",
            input.sequence
        ))));
    }

    // Live observers see incremental progress; the settlement later
    // re-broadcasts the authoritative log.
    state.event_bus.publish(ExecutionEvent::log_entry(
        job_id,
        json!({
            "sequence": input.sequence,
            "status": input.status,
            "error": input.error,
        }),
    ));

    tracing::debug!(
        job_id,
        device_id = auth.device.id,
        sequence = input.sequence,
        "Incremental item report",
    );

    Ok(Json(DataResponse { data: json!({ "ok": true }) }))
}

// ---------------------------------------------------------------------------
// Terminal completion
// ---------------------------------------------------------------------------

/// POST /api/v1/devices/me/jobs/{id}/complete
///
/// Apply a terminal completion report exactly once. Counters, the per-item
/// execution report, item statuses, and the per-slot inventory deduction
/// (done entries only, clamped at zero) commit together. A duplicate
/// report from a retrying device finds the job already terminal and is
/// acknowledged without further mutation; a canceled job rejects the
/// report outright.
///
/// Broadcasting happens after the commit and is best-effort: observer
/// failures never roll back the reconciliation.
pub async fn complete_job(
    auth: AuthDevice,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
    Json(input): Json<CompleteJobReport>,
) -> AppResult<impl IntoResponse> {
    find_and_authorize(&state.pool, job_id, &auth).await?;

    if input.items_completed < 0 || input.items_failed < 0 {
        return Err(AppError::Core(CoreError::Validation(
            "Completion counters must be non-negative".into(),
        )));
    }
    for entry in &input.execution_log {
        if entry.status == ItemOutcome::Running {
            return Err(AppError::Core(CoreError::Validation(
                "A completion log entry must be 'done' or 'failed'".into(),
            )));
        }
    }

    let settlement = JobRepo::settle(&state.pool, job_id, &input).await?;

    let job = match settlement {
        Settlement::AlreadyTerminal(job) => {
            tracing::info!(
                job_id,
                device_id = auth.device.id,
                status = status_name(job.status_id),
                "Duplicate completion report acknowledged",
            );
            return Ok(Json(DataResponse {
                data: CompletionAck {
                    already_completed: true,
                    status: status_name(job.status_id),
                    items_completed: job.items_completed,
                    items_failed: job.items_failed,
                },
            }));
        }
        Settlement::Canceled => {
            return Err(AppError::Core(CoreError::Conflict(
                "Job was canceled and cannot be completed".into(),
            )));
        }
        Settlement::Applied(job) => job,
    };

    tracing::info!(
        job_id,
        device_id = auth.device.id,
        status = status_name(job.status_id),
        items_completed = input.items_completed,
        items_failed = input.items_failed,
        "Job settled",
    );

    // Post-commit broadcast: one event per log entry, then the completion.
    for entry in &input.execution_log {
        let payload = serde_json::to_value(entry).unwrap_or(serde_json::Value::Null);
        state
            .event_bus
            .publish(ExecutionEvent::log_entry(job_id, payload));
    }
    state.event_bus.publish(ExecutionEvent::completion(
        job_id,
        json!({
            "ok": true,
            "status": status_name(job.status_id),
            "items_completed": job.items_completed,
            "items_failed": job.items_failed,
        }),
    ));

    Ok(Json(DataResponse {
        data: CompletionAck {
            already_completed: false,
            status: status_name(job.status_id),
            items_completed: job.items_completed,
            items_failed: job.items_failed,
        },
    }))
}
