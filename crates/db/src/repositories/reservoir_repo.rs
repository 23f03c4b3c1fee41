//! Repository for the `reservoir_configs` table.
//!
//! At most one row exists per (user, slot); writes are upserts keyed on
//! the `uq_reservoir_user_slot` constraint.

use sqlx::PgPool;
use tempero_core::types::DbId;

use crate::models::reservoir::{ReservoirConfig, UpsertReservoir};

/// Column list for `reservoir_configs` queries.
const COLUMNS: &str = "id, user_id, slot, label, flow_rate_g_per_sec, stock_grams, updated_at";

/// Provides access to per-user reservoir slot configuration.
pub struct ReservoirRepo;

impl ReservoirRepo {
    /// All configured slots for a user, in slot order.
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<ReservoirConfig>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM reservoir_configs WHERE user_id = $1 ORDER BY slot ASC"
        );
        sqlx::query_as::<_, ReservoirConfig>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Create or replace the configuration of one slot.
    pub async fn upsert(
        pool: &PgPool,
        user_id: DbId,
        slot: i16,
        input: &UpsertReservoir,
    ) -> Result<ReservoirConfig, sqlx::Error> {
        let query = format!(
            "INSERT INTO reservoir_configs (user_id, slot, label, flow_rate_g_per_sec, stock_grams) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT ON CONSTRAINT uq_reservoir_user_slot DO UPDATE SET \
                label = EXCLUDED.label, \
                flow_rate_g_per_sec = EXCLUDED.flow_rate_g_per_sec, \
                stock_grams = EXCLUDED.stock_grams, \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ReservoirConfig>(&query)
            .bind(user_id)
            .bind(slot)
            .bind(&input.label)
            .bind(input.flow_rate_g_per_sec)
            .bind(input.stock_grams)
            .fetch_one(pool)
            .await
    }

    /// Upsert several slots in one transaction. The caller has already
    /// rejected duplicate slot numbers in the payload.
    pub async fn upsert_many(
        pool: &PgPool,
        user_id: DbId,
        entries: &[(i16, &UpsertReservoir)],
    ) -> Result<Vec<ReservoirConfig>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let query = format!(
            "INSERT INTO reservoir_configs (user_id, slot, label, flow_rate_g_per_sec, stock_grams) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT ON CONSTRAINT uq_reservoir_user_slot DO UPDATE SET \
                label = EXCLUDED.label, \
                flow_rate_g_per_sec = EXCLUDED.flow_rate_g_per_sec, \
                stock_grams = EXCLUDED.stock_grams, \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );

        let mut out = Vec::with_capacity(entries.len());
        for (slot, input) in entries {
            let row = sqlx::query_as::<_, ReservoirConfig>(&query)
                .bind(user_id)
                .bind(slot)
                .bind(&input.label)
                .bind(input.flow_rate_g_per_sec)
                .bind(input.stock_grams)
                .fetch_one(&mut *tx)
                .await?;
            out.push(row);
        }

        tx.commit().await?;
        Ok(out)
    }
}
