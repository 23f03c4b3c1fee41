//! Repository for the `device_claims` table.
//!
//! A claim code binds a device to a user exactly once. Consumption is a
//! single conditional UPDATE so two racing redemptions cannot both win.

use sqlx::PgPool;
use tempero_core::claim::CLAIM_TTL_MINS;
use tempero_core::types::DbId;

use crate::models::device::DeviceClaim;

/// Column list for `device_claims` queries.
const COLUMNS: &str = "id, user_id, code, expires_at, used_at, created_at";

/// Provides access to one-time device pairing codes.
pub struct ClaimRepo;

impl ClaimRepo {
    /// Issue a fresh claim code for a user, replacing any outstanding
    /// unused codes. A global code collision violates
    /// `uq_device_claims_code`; the caller retries with a new code.
    pub async fn issue(
        pool: &PgPool,
        user_id: DbId,
        code: &str,
    ) -> Result<DeviceClaim, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM device_claims WHERE user_id = $1 AND used_at IS NULL")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let query = format!(
            "INSERT INTO device_claims (user_id, code, expires_at) \
             VALUES ($1, $2, NOW() + make_interval(mins => $3)) \
             RETURNING {COLUMNS}"
        );
        let claim = sqlx::query_as::<_, DeviceClaim>(&query)
            .bind(user_id)
            .bind(code)
            .bind(CLAIM_TTL_MINS as i32)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(claim)
    }

    /// Atomically consume a claim code: first valid, unused, unexpired
    /// redemption wins and marks the code used in the same statement.
    /// Returns `None` when the code is unknown, expired, or already used.
    pub async fn consume(pool: &PgPool, code: &str) -> Result<Option<DeviceClaim>, sqlx::Error> {
        let query = format!(
            "UPDATE device_claims SET used_at = NOW() \
             WHERE code = $1 AND used_at IS NULL AND expires_at > NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DeviceClaim>(&query)
            .bind(code)
            .fetch_optional(pool)
            .await
    }
}
