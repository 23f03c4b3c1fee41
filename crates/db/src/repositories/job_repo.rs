//! Repository for the `jobs` and `job_items` tables.
//!
//! Admission (one active job per user) is checked by the handler before
//! insert and closed against races by the `uq_jobs_user_active` partial
//! unique index. Settlement locks the job row so concurrent completion
//! reports serialize; the terminal-status gate then makes the second
//! report a no-op.

use sqlx::{Acquire, PgPool, Postgres, Transaction};
use tempero_core::resolver::ResolvedItem;
use tempero_core::settlement;
use tempero_core::types::DbId;

use crate::models::job::{CompleteJobReport, Job, JobItem};
use crate::models::status::{JobItemStatus, JobStatus, ACTIVE_JOB_STATUSES};

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, user_id, recipe_id, status_id, requested_servings, \
    created_at, started_at, finished_at, error_message, \
    items_completed, items_failed, execution_report";

/// Column list for `job_items` queries.
const ITEM_COLUMNS: &str = "\
    id, job_id, sequence, reservoir_slot, label, quantity_grams, \
    duration_seconds, status_id, error_message";

/// Outcome of a terminal completion report.
#[derive(Debug)]
pub enum Settlement {
    /// This report settled the job: counters, report, and inventory were
    /// applied.
    Applied(Job),
    /// The job was already terminal; nothing was mutated. Duplicate
    /// delivery from a retrying device lands here.
    AlreadyTerminal(Job),
    /// The job was canceled; a canceled job cannot be completed.
    Canceled,
}

/// Provides access to dispense jobs and their items.
pub struct JobRepo;

impl JobRepo {
    /// The user's single queued/running job, if any.
    pub async fn find_active_by_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM jobs WHERE user_id = $1 AND status_id IN ($2, $3) \
             ORDER BY created_at ASC LIMIT 1"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(user_id)
            .bind(ACTIVE_JOB_STATUSES[0])
            .bind(ACTIVE_JOB_STATUSES[1])
            .fetch_optional(pool)
            .await
    }

    /// Persist a job and its items in one transaction. Items are numbered
    /// 1..N in the given (ingredient) order; stock is NOT touched here —
    /// deduction happens only on confirmed completion.
    pub async fn create_with_items(
        pool: &PgPool,
        user_id: DbId,
        recipe_id: DbId,
        requested_servings: i32,
        items: &[ResolvedItem],
    ) -> Result<Job, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO jobs (user_id, recipe_id, status_id, requested_servings) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        let job = sqlx::query_as::<_, Job>(&query)
            .bind(user_id)
            .bind(recipe_id)
            .bind(JobStatus::Queued.id())
            .bind(requested_servings)
            .fetch_one(&mut *tx)
            .await?;

        let item_query = "INSERT INTO job_items \
                (job_id, sequence, reservoir_slot, label, quantity_grams, duration_seconds, status_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)";
        for (idx, item) in items.iter().enumerate() {
            sqlx::query(item_query)
                .bind(job.id)
                .bind((idx + 1) as i16)
                .bind(item.slot)
                .bind(&item.label)
                .bind(item.quantity_grams)
                .bind(item.duration_seconds)
                .bind(JobItemStatus::Queued.id())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(job)
    }

    /// Find a job by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Ordered items for a job.
    pub async fn items_for(pool: &PgPool, job_id: DbId) -> Result<Vec<JobItem>, sqlx::Error> {
        let query = format!(
            "SELECT {ITEM_COLUMNS} FROM job_items WHERE job_id = $1 ORDER BY sequence ASC"
        );
        sqlx::query_as::<_, JobItem>(&query)
            .bind(job_id)
            .fetch_all(pool)
            .await
    }

    /// A user's recent jobs, newest first.
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: DbId,
        limit: i64,
    ) -> Result<Vec<Job>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM jobs WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(user_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Hand out the oldest queued job belonging to `owner_id`.
    ///
    /// At most one job per poll. The first hand-out stamps `started_at`;
    /// the status stays Queued until the device explicitly reports
    /// Running, so fully-offline devices that only report at the end are
    /// handled uniformly. `FOR UPDATE SKIP LOCKED` keeps two concurrent
    /// polls from racing on the same row.
    pub async fn next_for_owner(pool: &PgPool, owner_id: DbId) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "UPDATE jobs SET started_at = COALESCE(started_at, NOW()) \
             WHERE id = ( \
                 SELECT id FROM jobs \
                 WHERE user_id = $1 AND status_id = $2 \
                 ORDER BY created_at ASC, id ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(owner_id)
            .bind(JobStatus::Queued.id())
            .fetch_optional(pool)
            .await
    }

    /// Flip a job to Running on an incremental device report. Stamps
    /// `started_at` once; only applies while the job is still active.
    pub async fn mark_running(pool: &PgPool, job_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs SET status_id = $2, started_at = COALESCE(started_at, NOW()) \
             WHERE id = $1 AND status_id IN ($3, $4)",
        )
        .bind(job_id)
        .bind(JobStatus::Running.id())
        .bind(ACTIVE_JOB_STATUSES[0])
        .bind(ACTIVE_JOB_STATUSES[1])
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Update one item's status from an incremental device report.
    pub async fn update_item_status(
        pool: &PgPool,
        job_id: DbId,
        sequence: i16,
        status: JobItemStatus,
        error: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE job_items SET status_id = $3, error_message = $4 \
             WHERE job_id = $1 AND sequence = $2",
        )
        .bind(job_id)
        .bind(sequence)
        .bind(status.id())
        .bind(error)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Flip every active job of a user to Canceled with the given
    /// operator message. Returns how many jobs were affected. Best-effort
    /// with respect to the device: it is not interrupted mid-run.
    pub async fn cancel_active(
        pool: &PgPool,
        user_id: DbId,
        message: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs SET status_id = $2, finished_at = NOW(), error_message = $3 \
             WHERE user_id = $1 AND status_id IN ($4, $5)",
        )
        .bind(user_id)
        .bind(JobStatus::Canceled.id())
        .bind(message)
        .bind(ACTIVE_JOB_STATUSES[0])
        .bind(ACTIVE_JOB_STATUSES[1])
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Apply a terminal completion report exactly once.
    ///
    /// The job row is locked for the duration of the transaction, so two
    /// concurrent reports for the same job serialize here; whichever runs
    /// second finds a terminal status and returns
    /// [`Settlement::AlreadyTerminal`] without mutating anything.
    ///
    /// Inventory deduction runs inside a savepoint: if it fails
    /// unexpectedly the job is still marked terminal, with a note appended
    /// to `error_message`, so the device always gets its acknowledgment.
    pub async fn settle(
        pool: &PgPool,
        job_id: DbId,
        report: &CompleteJobReport,
    ) -> Result<Settlement, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1 FOR UPDATE");
        let job = sqlx::query_as::<_, Job>(&query)
            .bind(job_id)
            .fetch_one(&mut *tx)
            .await?;

        match JobStatus::from_id(job.status_id) {
            Some(JobStatus::Done | JobStatus::DonePartial | JobStatus::Failed) => {
                return Ok(Settlement::AlreadyTerminal(job));
            }
            Some(JobStatus::Canceled) => return Ok(Settlement::Canceled),
            _ => {}
        }

        // Per-item statuses from the log. Devices execute and report items
        // in sequence order, so the log position maps to the item sequence.
        for (idx, entry) in report.execution_log.iter().enumerate() {
            sqlx::query(
                "UPDATE job_items SET status_id = $3, error_message = $4 \
                 WHERE job_id = $1 AND sequence = $2",
            )
            .bind(job_id)
            .bind((idx + 1) as i16)
            .bind(JobItemStatus::from(entry.status).id())
            .bind(&entry.error)
            .execute(&mut *tx)
            .await?;
        }

        // Inventory: only "done" entries count, per-slot sums, clamped at
        // zero. A failure here must not block the terminal status update.
        let deductions = settlement::deduct_per_slot(&report.execution_log);
        let mut deduction_note: Option<String> = None;
        if !deductions.is_empty() {
            match Self::apply_deductions(&mut tx, job.user_id, &deductions).await {
                Ok(()) => {}
                Err(e) => {
                    tracing::error!(job_id, error = %e, "Stock deduction failed during settlement");
                    deduction_note = Some(format!("stock deduction failed: {e}"));
                }
            }
        }

        let status = if report.items_failed > 0 {
            JobStatus::DonePartial
        } else {
            JobStatus::Done
        };
        let report_json = serde_json::to_value(&report.execution_log)
            .unwrap_or(serde_json::Value::Null);

        let query = format!(
            "UPDATE jobs SET \
                status_id = $2, \
                items_completed = $3, \
                items_failed = $4, \
                execution_report = $5, \
                finished_at = NOW(), \
                error_message = COALESCE($6, error_message) \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        let job = sqlx::query_as::<_, Job>(&query)
            .bind(job_id)
            .bind(status.id())
            .bind(report.items_completed)
            .bind(report.items_failed)
            .bind(report_json)
            .bind(deduction_note)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Settlement::Applied(job))
    }

    /// Subtract the summed grams from each slot with known stock. Runs in
    /// a savepoint so a failure rolls back only the deduction, not the
    /// enclosing settlement.
    async fn apply_deductions(
        tx: &mut Transaction<'_, Postgres>,
        owner_id: DbId,
        deductions: &std::collections::BTreeMap<i16, f64>,
    ) -> Result<(), sqlx::Error> {
        let mut sp = tx.begin().await?;

        for (&slot, &grams) in deductions {
            let stock: Option<(Option<f64>,)> = sqlx::query_as(
                "SELECT stock_grams FROM reservoir_configs \
                 WHERE user_id = $1 AND slot = $2 FOR UPDATE",
            )
            .bind(owner_id)
            .bind(slot)
            .fetch_optional(&mut *sp)
            .await?;

            // Unknown stock (or an unconfigured slot) is left untouched.
            let Some((Some(current),)) = stock else {
                continue;
            };

            sqlx::query(
                "UPDATE reservoir_configs SET stock_grams = $3, updated_at = NOW() \
                 WHERE user_id = $1 AND slot = $2",
            )
            .bind(owner_id)
            .bind(slot)
            .bind(settlement::clamp_stock(current, grams))
            .execute(&mut *sp)
            .await?;
        }

        sp.commit().await?;
        Ok(())
    }
}
