//! Bearer token verification.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, errors::ErrorKind};

use crate::claims::{JwtClaims, TokenValidationError, validate_claims};

/// Verifies a raw bearer token and yields its claims.
///
/// `now` is passed in so validation stays deterministic under test.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError>;
}

/// HMAC-SHA256 validator backed by a shared secret.
#[derive(Clone)]
pub struct Hs256JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Time checks run in `validate_claims` against the caller's clock.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        Self {
            key: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }
}

impl core::fmt::Debug for Hs256JwtValidator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256JwtValidator").finish_non_exhaustive()
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError> {
        let data = decode::<JwtClaims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => TokenValidationError::InvalidSignature,
                _ => TokenValidationError::Malformed(e.to_string()),
            }
        })?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn mint(secret: &str, admin: bool, now: DateTime<Utc>) -> String {
        let claims = JwtClaims {
            sub: "user-42".to_string(),
            email: Some("a@example.com".to_string()),
            name: None,
            admin,
            issued_at: now,
            expires_at: now + Duration::hours(1),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn accepts_token_signed_with_the_shared_secret() {
        let now = test_time();
        let validator = Hs256JwtValidator::new("s3cret");
        let claims = validator.validate(&mint("s3cret", true, now), now).unwrap();
        assert_eq!(claims.sub, "user-42");
        assert!(claims.admin);
        assert_eq!(claims.email.as_deref(), Some("a@example.com"));
    }

    #[test]
    fn rejects_token_signed_with_another_secret() {
        let now = test_time();
        let validator = Hs256JwtValidator::new("s3cret");
        let err = validator.validate(&mint("other", false, now), now).unwrap_err();
        assert_eq!(err, TokenValidationError::InvalidSignature);
    }

    #[test]
    fn rejects_expired_token_against_caller_clock() {
        let now = test_time();
        let validator = Hs256JwtValidator::new("s3cret");
        let token = mint("s3cret", false, now);
        let err = validator.validate(&token, now + Duration::hours(2)).unwrap_err();
        assert_eq!(err, TokenValidationError::Expired);
    }

    #[test]
    fn garbage_is_malformed() {
        let validator = Hs256JwtValidator::new("s3cret");
        let err = validator.validate("not.a.jwt", test_time()).unwrap_err();
        assert!(matches!(err, TokenValidationError::Malformed(_)));
    }
}
