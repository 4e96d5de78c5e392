//! Token issuing.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use inkwell_core::config::AuthConfig;
use inkwell_core::error::AppError;

use super::claims::{Claims, TokenKind};

/// Signs HS256 tokens with the configured secret.
#[derive(Clone)]
pub struct JwtEncoder {
    key: EncodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for JwtEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtEncoder")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

/// Tokens handed out at login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

impl JwtEncoder {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            access_ttl: Duration::minutes(config.jwt_access_ttl_minutes as i64),
            refresh_ttl: Duration::hours(config.jwt_refresh_ttl_hours as i64),
        }
    }

    pub fn issue_pair(&self, user_id: Uuid, username: &str) -> Result<TokenPair, AppError> {
        let now = Utc::now();
        let (access_token, access_expires_at) =
            self.sign(user_id, username, TokenKind::Access, now, self.access_ttl)?;
        let (refresh_token, refresh_expires_at) =
            self.sign(user_id, username, TokenKind::Refresh, now, self.refresh_ttl)?;
        Ok(TokenPair {
            access_token,
            refresh_token,
            access_expires_at,
            refresh_expires_at,
        })
    }

    fn sign(
        &self,
        user_id: Uuid,
        username: &str,
        kind: TokenKind,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<(String, DateTime<Utc>), AppError> {
        let expires_at = now + ttl;
        let claims = Claims {
            sub: user_id,
            username: username.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4(),
            kind,
        };
        let token = encode(&Header::default(), &claims, &self.key)
            .map_err(|e| AppError::internal(format!("Failed to sign {kind:?} token: {e}")))?;
        Ok((token, expires_at))
    }
}
