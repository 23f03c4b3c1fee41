//! JWT issuance and validation for both principal kinds.
//!
//! User sessions and device credentials are both HS256-signed bearer
//! tokens differentiated only by an embedded `kind` tag. One validation
//! function decodes either; the extractors dispatch on the tag, so there
//! is exactly one decode path.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tempero_core::types::DbId;
use uuid::Uuid;

/// Which kind of principal a token authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    /// A human user; `sub` is the user's database id.
    User,
    /// A claimed dispenser; `sub` is the device's database id.
    Device,
}

/// JWT claims embedded in every token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject -- the principal's internal database id.
    pub sub: DbId,
    /// Principal kind tag ("user" or "device").
    pub kind: PrincipalKind,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Unique token identifier (UUID v4) for revocation / audit.
    pub jti: String,
}

/// Configuration for JWT token generation and validation.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 secret used to sign and verify tokens.
    pub secret: String,
    /// User token lifetime in minutes (default: 60).
    pub user_token_expiry_mins: i64,
    /// Device credential lifetime in days (default: 180).
    pub device_token_expiry_days: i64,
}

/// Default user token expiry in minutes.
const DEFAULT_USER_EXPIRY_MINS: i64 = 60;
/// Default device credential expiry in days.
const DEFAULT_DEVICE_EXPIRY_DAYS: i64 = 180;

impl JwtConfig {
    /// Load JWT configuration from environment variables.
    ///
    /// | Env Var                  | Required | Default |
    /// |--------------------------|----------|---------|
    /// | `JWT_SECRET`             | **yes**  | --      |
    /// | `JWT_USER_EXPIRY_MINS`   | no       | `60`    |
    /// | `JWT_DEVICE_EXPIRY_DAYS` | no       | `180`   |
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is not set or is empty.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");

        let user_token_expiry_mins: i64 = std::env::var("JWT_USER_EXPIRY_MINS")
            .unwrap_or_else(|_| DEFAULT_USER_EXPIRY_MINS.to_string())
            .parse()
            .expect("JWT_USER_EXPIRY_MINS must be a valid i64");

        let device_token_expiry_days: i64 = std::env::var("JWT_DEVICE_EXPIRY_DAYS")
            .unwrap_or_else(|_| DEFAULT_DEVICE_EXPIRY_DAYS.to_string())
            .parse()
            .expect("JWT_DEVICE_EXPIRY_DAYS must be a valid i64");

        Self {
            secret,
            user_token_expiry_mins,
            device_token_expiry_days,
        }
    }
}

/// Generate an HS256 user session token.
pub fn generate_user_token(
    user_id: DbId,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    generate_token(user_id, PrincipalKind::User, config.user_token_expiry_mins * 60, config)
}

/// Generate an HS256 device credential, scoped to one device id and valid
/// for the long device expiry window.
pub fn generate_device_token(
    device_id: DbId,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    generate_token(
        device_id,
        PrincipalKind::Device,
        config.device_token_expiry_days * 24 * 60 * 60,
        config,
    )
}

fn generate_token(
    principal_id: DbId,
    kind: PrincipalKind,
    expiry_secs: i64,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();

    let claims = Claims {
        sub: principal_id,
        kind,
        exp: now + expiry_secs,
        iat: now,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(), // HS256
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Validate and decode a token of either kind, returning the embedded
/// [`Claims`]. Validates the signature and expiration automatically; the
/// caller dispatches on `claims.kind`.
pub fn validate_token(
    token: &str,
    config: &JwtConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(), // HS256, validates exp
    )?;
    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper to build a test config with a known secret.
    fn test_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            user_token_expiry_mins: 60,
            device_token_expiry_days: 180,
        }
    }

    #[test]
    fn test_user_token_round_trip() {
        let config = test_config();
        let token =
            generate_user_token(42, &config).expect("token generation should succeed");

        let claims = validate_token(&token, &config).expect("token validation should succeed");
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.kind, PrincipalKind::User);
        assert!(claims.exp > claims.iat);
        assert!(!claims.jti.is_empty());
    }

    #[test]
    fn test_device_token_carries_device_tag_and_long_expiry() {
        let config = test_config();
        let token =
            generate_device_token(7, &config).expect("token generation should succeed");

        let claims = validate_token(&token, &config).expect("token validation should succeed");
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.kind, PrincipalKind::Device);

        // 180 days, give or take a few seconds of test latency.
        let lifetime = claims.exp - claims.iat;
        assert_eq!(lifetime, 180 * 24 * 60 * 60);
    }

    #[test]
    fn test_expired_token_fails() {
        let config = test_config();

        // Manually create an already-expired token.
        // Use a margin well beyond the default 60-second leeway.
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: 1,
            kind: PrincipalKind::User,
            exp: now - 300, // expired 5 minutes ago (well past leeway)
            iat: now - 600,
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .expect("encoding should succeed");

        let result = validate_token(&token, &config);
        assert!(result.is_err(), "expired token must fail validation");
    }

    #[test]
    fn test_different_secrets_fail() {
        let config_a = JwtConfig {
            secret: "secret-alpha".to_string(),
            user_token_expiry_mins: 60,
            device_token_expiry_days: 180,
        };
        let config_b = JwtConfig {
            secret: "secret-bravo".to_string(),
            user_token_expiry_mins: 60,
            device_token_expiry_days: 180,
        };

        let token =
            generate_user_token(1, &config_a).expect("token generation should succeed");

        let result = validate_token(&token, &config_b);
        assert!(
            result.is_err(),
            "token signed with a different secret must fail"
        );
    }

    #[test]
    fn test_kind_tag_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&PrincipalKind::Device).unwrap(),
            "\"device\""
        );
        assert_eq!(
            serde_json::to_string(&PrincipalKind::User).unwrap(),
            "\"user\""
        );
    }
}
