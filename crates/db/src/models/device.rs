//! Device and claim-code entity models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tempero_core::types::{DbId, Timestamp};

/// A row from the `devices` table: one physical dispenser, claimed by
/// exactly one user at a time (ownership is reassignable via re-claim).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Device {
    pub id: DbId,
    pub user_id: DbId,
    /// Stable hardware identifier reported by the device (e.g. chip id).
    pub hardware_uid: String,
    pub name: Option<String>,
    pub fw_version: Option<String>,
    /// Opaque status blob from the device's last heartbeat.
    pub status_json: Option<serde_json::Value>,
    pub last_seen: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// A row from the `device_claims` table: a one-time pairing code.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DeviceClaim {
    pub id: DbId,
    pub user_id: DbId,
    pub code: String,
    pub expires_at: Timestamp,
    pub used_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// DTO for `POST /devices/claim` — a device redeeming a pairing code.
#[derive(Debug, Deserialize)]
pub struct RedeemClaim {
    pub code: String,
    pub hardware_uid: String,
    pub fw_version: Option<String>,
}

/// DTO for `POST /devices/me/heartbeat`.
#[derive(Debug, Deserialize)]
pub struct Heartbeat {
    pub fw_version: Option<String>,
    /// Opaque device-defined status payload, stored as-is.
    pub status: Option<serde_json::Value>,
}
