//! Job and job-item entity models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tempero_core::settlement::{ExecutionLogEntry, ItemOutcome};
use tempero_core::types::{DbId, Timestamp};

use super::status::StatusId;

/// A row from the `jobs` table.
///
/// Immutable after creation except for status, timestamps, completion
/// counters, and the execution report. Once the status is terminal no
/// further mutation happens — that boundary is what makes duplicate
/// completion reports safe.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Job {
    pub id: DbId,
    pub user_id: DbId,
    /// Source recipe; `None` if the recipe was deleted afterwards.
    pub recipe_id: Option<DbId>,
    pub status_id: StatusId,
    pub requested_servings: i32,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
    pub error_message: Option<String>,
    pub items_completed: Option<i32>,
    pub items_failed: Option<i32>,
    /// Serialized per-item execution log from the terminal completion
    /// report.
    pub execution_report: Option<serde_json::Value>,
}

/// A row from the `job_items` table: one dispense step, executed in
/// ascending `sequence` order.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct JobItem {
    pub id: DbId,
    pub job_id: DbId,
    pub sequence: i16,
    pub reservoir_slot: i16,
    pub label: String,
    pub quantity_grams: f64,
    pub duration_seconds: f64,
    pub status_id: StatusId,
    pub error_message: Option<String>,
}

/// A job together with its ordered items, as handed to devices and
/// returned by the read endpoints.
#[derive(Debug, Serialize)]
pub struct JobDetail {
    #[serde(flatten)]
    pub job: Job,
    pub items: Vec<JobItem>,
}

/// DTO for `POST /jobs`.
///
/// `servings` is the scaling input; `multiplier` is the legacy name for
/// the same thing and is honored only when `servings` is absent.
#[derive(Debug, Deserialize)]
pub struct CreateJob {
    pub recipe_id: DbId,
    pub servings: Option<i32>,
    pub multiplier: Option<i32>,
}

impl CreateJob {
    /// Collapse `servings` and the legacy `multiplier` into one value.
    /// Explicit servings always wins; neither present defaults to 1.
    pub fn effective_servings(&self) -> i32 {
        self.servings.or(self.multiplier).unwrap_or(1)
    }
}

/// DTO for `POST /devices/me/jobs/{id}/report` — one incremental per-item
/// status update. Never settles the job and never touches stock.
#[derive(Debug, Deserialize)]
pub struct ItemReport {
    pub sequence: i16,
    pub status: ItemOutcome,
    pub error: Option<String>,
}

/// DTO for `POST /devices/me/jobs/{id}/complete` — the terminal,
/// stock-affecting completion report.
#[derive(Debug, Deserialize)]
pub struct CompleteJobReport {
    pub items_completed: i32,
    pub items_failed: i32,
    pub execution_log: Vec<ExecutionLogEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_servings_wins_over_legacy_multiplier() {
        let input = CreateJob {
            recipe_id: 1,
            servings: Some(4),
            multiplier: Some(2),
        };
        assert_eq!(input.effective_servings(), 4);
    }

    #[test]
    fn legacy_multiplier_applies_when_servings_absent() {
        let input = CreateJob {
            recipe_id: 1,
            servings: None,
            multiplier: Some(3),
        };
        assert_eq!(input.effective_servings(), 3);
    }

    #[test]
    fn servings_default_to_one() {
        let input = CreateJob {
            recipe_id: 1,
            servings: None,
            multiplier: None,
        };
        assert_eq!(input.effective_servings(), 1);
    }
}
