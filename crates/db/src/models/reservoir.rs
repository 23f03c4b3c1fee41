//! Reservoir configuration models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tempero_core::resolver::SlotConfig;
use tempero_core::types::{DbId, Timestamp};
use validator::Validate;

/// A row from the `reservoir_configs` table: what one physical slot holds
/// and how it is calibrated.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ReservoirConfig {
    pub id: DbId,
    pub user_id: DbId,
    /// Physical slot number, 1..=4.
    pub slot: i16,
    /// Spice label from the user's catalog; `None` means the slot is empty.
    pub label: Option<String>,
    /// Calibrated flow rate in g/s; `None` means uncalibrated.
    pub flow_rate_g_per_sec: Option<f64>,
    /// Current stock in grams; `None` means unknown (never blocks jobs).
    pub stock_grams: Option<f64>,
    pub updated_at: Timestamp,
}

impl ReservoirConfig {
    /// Project this row into the resolver's view of a slot.
    pub fn to_slot_config(&self) -> SlotConfig {
        SlotConfig {
            slot: self.slot,
            label: self.label.clone(),
            flow_rate_g_per_sec: self.flow_rate_g_per_sec,
            stock_grams: self.stock_grams,
        }
    }
}

/// DTO for `PUT /reservoirs/{slot}`.
#[derive(Debug, Deserialize, Validate)]
pub struct UpsertReservoir {
    #[validate(length(min = 1, max = 80))]
    pub label: Option<String>,
    #[validate(range(exclusive_min = 0.0))]
    pub flow_rate_g_per_sec: Option<f64>,
    #[validate(range(min = 0.0))]
    pub stock_grams: Option<f64>,
}

/// One entry of a bulk `PUT /reservoirs` payload.
#[derive(Debug, Deserialize, Validate)]
pub struct UpsertReservoirSlot {
    #[validate(range(min = 1, max = 4))]
    pub slot: i16,
    #[validate(nested)]
    #[serde(flatten)]
    pub config: UpsertReservoir,
}
