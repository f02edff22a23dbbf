use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JWT claims model (transport-agnostic).
///
/// This is the minimal set of claims the storefront expects from the external
/// identity provider once a token has been decoded and its signature verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject: the provider's user identifier.
    pub sub: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Whether the user holds the administrator role.
    #[serde(default)]
    pub admin: bool,

    /// Issued-at timestamp.
    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,

    /// Expiration timestamp.
    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("token subject is empty")]
    MissingSubject,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token signature is invalid")]
    InvalidSignature,
}

/// Deterministically validate JWT claims.
///
/// This validates the *claims* only; signature checks live in [`crate::jwt`].
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.sub.trim().is_empty() {
        return Err(TokenValidationError::MissingSubject);
    }
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn claims(issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> JwtClaims {
        JwtClaims {
            sub: "user-1".to_string(),
            email: None,
            name: None,
            admin: false,
            issued_at,
            expires_at,
        }
    }

    #[test]
    fn accepts_claims_inside_their_window() {
        let now = test_time();
        let c = claims(now - Duration::minutes(1), now + Duration::hours(1));
        assert_eq!(validate_claims(&c, now), Ok(()));
    }

    #[test]
    fn rejects_expired_and_future_tokens() {
        let now = test_time();
        let expired = claims(now - Duration::hours(2), now - Duration::hours(1));
        assert_eq!(validate_claims(&expired, now), Err(TokenValidationError::Expired));

        let future = claims(now + Duration::minutes(5), now + Duration::hours(1));
        assert_eq!(validate_claims(&future, now), Err(TokenValidationError::NotYetValid));
    }

    #[test]
    fn rejects_blank_subject() {
        let now = test_time();
        let mut c = claims(now, now + Duration::hours(1));
        c.sub = " ".to_string();
        assert_eq!(validate_claims(&c, now), Err(TokenValidationError::MissingSubject));
    }

    #[test]
    fn timestamps_use_numeric_jwt_fields() {
        let now = test_time();
        let c = claims(now, now + Duration::hours(1));
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["iat"], serde_json::json!(now.timestamp()));
        assert_eq!(json["exp"], serde_json::json!(now.timestamp() + 3600));
        assert_eq!(json["admin"], serde_json::json!(false));
    }
}
