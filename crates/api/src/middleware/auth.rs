//! JWT-based authentication extractors for Axum handlers.
//!
//! Both extractors run the same token validation and then dispatch on the
//! embedded principal kind: [`AuthUser`] accepts only user tokens,
//! [`AuthDevice`] only device credentials. A device extractor also
//! refreshes the device's `last_seen` — every authenticated device
//! interaction counts as a liveness signal, not just heartbeats.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tempero_core::error::CoreError;
use tempero_core::types::DbId;
use tempero_db::models::device::Device;
use tempero_db::repositories::DeviceRepo;

use crate::auth::jwt::{validate_token, Claims, PrincipalKind};
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated user extracted from a JWT Bearer token in the
/// `Authorization` header.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user's internal database id (from `claims.sub`).
    pub user_id: DbId,
}

/// Authenticated device extracted from a device-tagged JWT Bearer token.
/// Carries the full device row so handlers know the owning user.
#[derive(Debug, Clone)]
pub struct AuthDevice {
    pub device: Device,
}

/// Pull and validate the Bearer token from the `Authorization` header.
fn bearer_claims(parts: &Parts, state: &AppState) -> Result<Claims, AppError> {
    let auth_header = parts
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Missing Authorization header".into(),
            ))
        })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        AppError::Core(CoreError::Unauthorized(
            "Invalid Authorization format. Expected: Bearer <token>".into(),
        ))
    })?;

    validate_token(token, &state.config.jwt).map_err(|_| {
        AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
    })
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = bearer_claims(parts, state)?;

        if claims.kind != PrincipalKind::User {
            return Err(AppError::Core(CoreError::Unauthorized(
                "A user token is required for this endpoint".into(),
            )));
        }

        Ok(AuthUser {
            user_id: claims.sub,
        })
    }
}

impl FromRequestParts<AppState> for AuthDevice {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = bearer_claims(parts, state)?;

        if claims.kind != PrincipalKind::Device {
            return Err(AppError::Core(CoreError::Unauthorized(
                "A device credential is required for this endpoint".into(),
            )));
        }

        let device = DeviceRepo::find_by_id(&state.pool, claims.sub)
            .await?
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Device credential refers to an unknown device".into(),
                ))
            })?;

        DeviceRepo::touch_last_seen(&state.pool, device.id).await?;

        Ok(AuthDevice { device })
    }
}
