use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    error::{AppError, Result},
};

/// Claims
///
/// Payload of a session token. Signed with the server secret and checked on every
/// authenticated request.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user id the session belongs to.
    pub sub: Uuid,
    /// Expiration Time (exp), seconds since the epoch.
    pub exp: i64,
    /// Issued At (iat), seconds since the epoch.
    pub iat: i64,
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// TokenService
///
/// Issues and verifies HS256 session tokens bound to a user id. Cheap to clone:
/// the keys are shared behind an `Arc`.
#[derive(Clone)]
pub struct TokenService {
    keys: Arc<Keys>,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            keys: Arc::new(Keys {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
            }),
            ttl,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.jwt_secret, Duration::minutes(config.token_ttl_minutes))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a token for `user_id` valid from now for the configured lifetime.
    pub fn issue(&self, user_id: Uuid) -> Result<String> {
        self.issue_at(user_id, Utc::now())
    }

    /// Issues a token as if it had been created at `issued_at`.
    pub fn issue_at(&self, user_id: Uuid, issued_at: DateTime<Utc>) -> Result<String> {
        let claims = Claims {
            sub: user_id,
            iat: issued_at.timestamp(),
            exp: (issued_at + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.keys.encoding)
            .map_err(|e| AppError::Internal(format!("token encoding failed: {e}")))
    }

    /// verify
    ///
    /// Decodes `token` and returns the user id it is bound to. Any failure
    /// (bad signature, expiry, malformed input) is `InvalidToken`.
    pub fn verify(&self, token: &str) -> Result<Uuid> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        // Expiry is exact: no grace period.
        validation.leeway = 0;

        match decode::<Claims>(token, &self.keys.decoding, &validation) {
            Ok(data) => Ok(data.claims.sub),
            Err(e) => {
                tracing::debug!("token rejected: {:?}", e.kind());
                Err(AppError::InvalidToken)
            }
        }
    }
}
