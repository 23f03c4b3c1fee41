//! Handlers for the `/devices` resource: claim-code issuance and
//! redemption, heartbeats, and the user's device listing.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use tempero_core::claim;
use tempero_core::error::CoreError;
use tempero_core::liveness::{self, HEARTBEAT_INTERVAL_SECS};
use tempero_core::types::{DbId, Timestamp};
use tempero_db::models::device::{Device, Heartbeat, RedeemClaim};
use tempero_db::repositories::{ClaimRepo, DeviceRepo};

use crate::auth::jwt::generate_device_token;
use crate::error::{is_unique_violation, AppError, AppResult};
use crate::middleware::auth::{AuthDevice, AuthUser};
use crate::response::DataResponse;
use crate::state::AppState;

/// How many fresh codes to try when a generated claim code collides with
/// an outstanding one. Collisions are rare (1-in-a-million per live code).
const CLAIM_ISSUE_ATTEMPTS: usize = 5;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Response for `POST /devices/claims`.
#[derive(Debug, Serialize)]
pub struct ClaimCodeResponse {
    pub code: String,
    pub expires_at: Timestamp,
}

/// Response for `POST /devices/claim` (device redemption).
#[derive(Debug, Serialize)]
pub struct RedeemResponse {
    pub device_token: String,
    /// Credential lifetime in seconds.
    pub expires_in: i64,
    pub device_id: DbId,
    /// Heartbeat interval the device should use, in seconds.
    pub heartbeat_interval_secs: u64,
}

/// One device in the user-facing listing, with the computed liveness flag.
#[derive(Debug, Serialize)]
pub struct DeviceView {
    pub id: DbId,
    pub hardware_uid: String,
    pub name: Option<String>,
    pub fw_version: Option<String>,
    pub last_seen: Option<Timestamp>,
    /// Recomputed from `last_seen` on every read, never cached.
    pub online: bool,
}

impl DeviceView {
    fn from_device(device: Device, now: Timestamp) -> Self {
        let online = liveness::is_online(device.last_seen, now);
        Self {
            id: device.id,
            hardware_uid: device.hardware_uid,
            name: device.name,
            fw_version: device.fw_version,
            last_seen: device.last_seen,
            online,
        }
    }
}

/// Response for `POST /devices/me/heartbeat`.
#[derive(Debug, Serialize)]
pub struct HeartbeatAck {
    pub heartbeat_interval_secs: u64,
}

// ---------------------------------------------------------------------------
// User-facing handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/devices/claims
///
/// Issue a fresh 10-minute claim code for the caller, replacing any
/// outstanding unused code. Retries on the (rare) global code collision.
pub async fn create_claim(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let mut last_err: Option<sqlx::Error> = None;

    for _ in 0..CLAIM_ISSUE_ATTEMPTS {
        let code = claim::generate_code();
        match ClaimRepo::issue(&state.pool, auth.user_id, &code).await {
            Ok(claim) => {
                tracing::info!(user_id = auth.user_id, "Claim code issued");
                return Ok((
                    StatusCode::CREATED,
                    Json(DataResponse {
                        data: ClaimCodeResponse {
                            code: claim.code,
                            expires_at: claim.expires_at,
                        },
                    }),
                ));
            }
            Err(e) if is_unique_violation(&e) => {
                last_err = Some(e);
                continue;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(AppError::InternalError(format!(
        "Could not allocate a unique claim code: {}",
        last_err.map_or_else(|| "unknown".into(), |e| e.to_string())
    )))
}

/// GET /api/v1/devices
///
/// The caller's devices with their computed online flag.
pub async fn list_devices(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let now = chrono::Utc::now();
    let devices = DeviceRepo::list_by_user(&state.pool, auth.user_id)
        .await?
        .into_iter()
        .map(|d| DeviceView::from_device(d, now))
        .collect::<Vec<_>>();

    Ok(Json(DataResponse { data: devices }))
}

// ---------------------------------------------------------------------------
// Device-facing handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/devices/claim (public)
///
/// A device redeems a claim code exactly once: the first valid, unused,
/// unexpired redemption wins and the code is consumed in the same
/// statement. The device row is created (or reassigned to the claiming
/// user) and a long-lived device credential is returned.
pub async fn redeem_claim(
    State(state): State<AppState>,
    Json(input): Json<RedeemClaim>,
) -> AppResult<impl IntoResponse> {
    if input.hardware_uid.trim().is_empty() || input.hardware_uid.len() > 64 {
        return Err(AppError::Core(CoreError::Validation(
            "hardware_uid must be 1-64 characters".into(),
        )));
    }

    let claim = ClaimRepo::consume(&state.pool, input.code.trim())
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict(
                "Claim code is invalid, expired, or already used".into(),
            ))
        })?;

    let device = DeviceRepo::upsert_by_hardware_uid(
        &state.pool,
        claim.user_id,
        input.hardware_uid.trim(),
        input.fw_version.as_deref(),
    )
    .await?;

    let device_token = generate_device_token(device.id, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    tracing::info!(
        device_id = device.id,
        user_id = claim.user_id,
        hardware_uid = %device.hardware_uid,
        "Device claimed",
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: RedeemResponse {
                device_token,
                expires_in: state.config.jwt.device_token_expiry_days * 24 * 60 * 60,
                device_id: device.id,
                heartbeat_interval_secs: HEARTBEAT_INTERVAL_SECS,
            },
        }),
    ))
}

/// POST /api/v1/devices/me/heartbeat
///
/// Refresh `last_seen` and store the opaque status blob. Returns the
/// advertised heartbeat interval.
pub async fn heartbeat(
    auth: AuthDevice,
    State(state): State<AppState>,
    Json(input): Json<Heartbeat>,
) -> AppResult<impl IntoResponse> {
    DeviceRepo::heartbeat(
        &state.pool,
        auth.device.id,
        input.fw_version.as_deref(),
        input.status.as_ref(),
    )
    .await?;

    tracing::debug!(device_id = auth.device.id, "Heartbeat");

    Ok(Json(DataResponse {
        data: HeartbeatAck {
            heartbeat_interval_secs: HEARTBEAT_INTERVAL_SECS,
        },
    }))
}
