//! Token validation.

use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use inkwell_core::config::AuthConfig;
use inkwell_core::error::AppError;

use super::claims::{Claims, TokenKind};

/// Verifies signature, expiry and token kind.
#[derive(Clone)]
pub struct JwtDecoder {
    key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtDecoder").finish_non_exhaustive()
    }
}

impl JwtDecoder {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 5;
        Self {
            key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    pub fn decode_access(&self, token: &str) -> Result<Claims, AppError> {
        self.decode_kind(token, TokenKind::Access)
    }

    pub fn decode_refresh(&self, token: &str) -> Result<Claims, AppError> {
        self.decode_kind(token, TokenKind::Refresh)
    }

    fn decode_kind(&self, token: &str, expected: TokenKind) -> Result<Claims, AppError> {
        let claims = decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|e| match e.kind() {
                JwtErrorKind::ExpiredSignature => AppError::unauthorized("Token has expired"),
                JwtErrorKind::InvalidSignature => AppError::unauthorized("Invalid token signature"),
                _ => AppError::unauthorized("Invalid token"),
            })?
            .claims;

        if claims.kind != expected {
            return Err(AppError::unauthorized(format!(
                "Expected a {expected:?} token"
            )));
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::jwt::encoder::JwtEncoder;

    fn config(secret: &str) -> AuthConfig {
        AuthConfig {
            jwt_secret: secret.to_string(),
            ..AuthConfig::default()
        }
    }

    #[test]
    fn test_issue_and_decode() {
        let cfg = config("a-long-enough-test-secret");
        let user = Uuid::new_v4();
        let pair = JwtEncoder::new(&cfg).issue_pair(user, "alice").unwrap();
        let decoder = JwtDecoder::new(&cfg);

        let claims = decoder.decode_access(&pair.access_token).unwrap();
        assert_eq!(claims.user_id(), user);
        assert_eq!(claims.username, "alice");
        assert!(decoder.decode_access(&pair.refresh_token).is_err());
        assert!(decoder.decode_refresh(&pair.refresh_token).is_ok());
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let pair = JwtEncoder::new(&config("secret-one-secret-one"))
            .issue_pair(Uuid::new_v4(), "bob")
            .unwrap();
        let err = JwtDecoder::new(&config("secret-two-secret-two"))
            .decode_access(&pair.access_token)
            .unwrap_err();
        assert!(err.is(inkwell_core::error::ErrorKind::Authentication));
    }
}
