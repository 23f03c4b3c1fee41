//! Repository for the `devices` table.

use sqlx::PgPool;
use tempero_core::types::DbId;

use crate::models::device::Device;

/// Column list for `devices` queries.
const COLUMNS: &str =
    "id, user_id, hardware_uid, name, fw_version, status_json, last_seen, created_at";

/// Provides access to claimed dispenser devices.
pub struct DeviceRepo;

impl DeviceRepo {
    /// Create a device row for a hardware id, or reassign an existing one
    /// to a new owner. Used by claim redemption; a device belongs to
    /// exactly one user at a time.
    pub async fn upsert_by_hardware_uid(
        pool: &PgPool,
        user_id: DbId,
        hardware_uid: &str,
        fw_version: Option<&str>,
    ) -> Result<Device, sqlx::Error> {
        let query = format!(
            "INSERT INTO devices (user_id, hardware_uid, fw_version) \
             VALUES ($1, $2, $3) \
             ON CONFLICT ON CONSTRAINT uq_devices_hardware_uid DO UPDATE SET \
                user_id = EXCLUDED.user_id, \
                fw_version = COALESCE(EXCLUDED.fw_version, devices.fw_version) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Device>(&query)
            .bind(user_id)
            .bind(hardware_uid)
            .bind(fw_version)
            .fetch_one(pool)
            .await
    }

    /// Find a device by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Device>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM devices WHERE id = $1");
        sqlx::query_as::<_, Device>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All devices claimed by a user.
    pub async fn list_by_user(pool: &PgPool, user_id: DbId) -> Result<Vec<Device>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM devices WHERE user_id = $1 ORDER BY created_at ASC"
        );
        sqlx::query_as::<_, Device>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Refresh `last_seen`. Called on every authenticated device
    /// interaction, not just heartbeats.
    pub async fn touch_last_seen(pool: &PgPool, device_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE devices SET last_seen = NOW() WHERE id = $1")
            .bind(device_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Record a heartbeat: `last_seen`, optional firmware version, and the
    /// opaque status blob.
    pub async fn heartbeat(
        pool: &PgPool,
        device_id: DbId,
        fw_version: Option<&str>,
        status_json: Option<&serde_json::Value>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE devices SET \
                last_seen = NOW(), \
                fw_version = COALESCE($2, fw_version), \
                status_json = COALESCE($3, status_json) \
             WHERE id = $1",
        )
        .bind(device_id)
        .bind(fw_version)
        .bind(status_json)
        .execute(pool)
        .await?;
        Ok(())
    }
}
