//! Domain error taxonomy.
//!
//! Variants carry enough structure for the API layer to render actionable
//! messages: which labels lack a reservoir, which lack calibration, which
//! reservoir is short on stock and by how much.

use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// One or more recipe ingredients could not be mapped to a reservoir.
    /// `missing` labels have no reservoir at all; `uncalibrated` labels have
    /// one but it lacks a usable flow rate. Missing takes priority: when any
    /// label is missing, `uncalibrated` is left empty.
    #[error("Reservoir mapping incomplete (missing: {missing:?}, uncalibrated: {uncalibrated:?})")]
    ReservoirMapping {
        missing: Vec<String>,
        uncalibrated: Vec<String>,
    },

    /// A reservoir with known stock cannot cover the job's aggregate demand.
    #[error("Insufficient stock in reservoir {slot}: need {required_g} g, have {available_g} g")]
    InsufficientStock {
        slot: i16,
        required_g: f64,
        available_g: f64,
    },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
