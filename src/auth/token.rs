//! Stateless session tokens: HS256-signed JWTs carrying the user id and email.
//!
//! Tokens are never persisted and cannot be revoked; they simply stop
//! verifying once `exp` has passed.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default validity window.
pub const DEFAULT_TOKEN_TTL_DAYS: u32 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: String,
    pub email: String,
    /// Issued-at, unix seconds.
    pub iat: i64,
    /// Expiry, unix seconds.
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("token invalid: {0}")]
    Invalid(String),
    #[error("failed to sign token: {0}")]
    Signing(String),
}

pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], ttl_days: u32) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl: Duration::days(i64::from(ttl_days)),
        }
    }

    pub fn issue(&self, user_id: &str, email: &str) -> Result<String, TokenError> {
        self.issue_at(user_id, email, Utc::now())
    }

    /// Mint a token as if issued at `issued_at`.
    pub fn issue_at(
        &self,
        user_id: &str,
        email: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let expires_at = issued_at
            .checked_add_signed(self.ttl)
            .ok_or_else(|| TokenError::Signing("expiry is out of range".into()))?;
        let claims = Claims {
            user_id: user_id.to_string(),
            email: email.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-signing-secret-with-enough-bytes";

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(SECRET, DEFAULT_TOKEN_TTL_DAYS)
    }

    #[test]
    fn issue_then_verify_returns_claims() {
        let tokens = issuer();
        let token = tokens.issue("user-1", "a@b.com").unwrap();
        let claims = tokens.verify(&token).unwrap();

        assert_eq!(claims.user_id, "user-1");
        assert_eq!(claims.email, "a@b.com");
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 3600);
    }

    #[test]
    fn expired_token_is_rejected_as_expired() {
        let tokens = issuer();
        let token = tokens
            .issue_at("user-1", "a@b.com", Utc::now() - Duration::days(8))
            .unwrap();
        assert!(matches!(tokens.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn token_just_inside_window_still_verifies() {
        let tokens = issuer();
        let token = tokens
            .issue_at("user-1", "a@b.com", Utc::now() - Duration::days(6))
            .unwrap();
        assert!(tokens.verify(&token).is_ok());
    }

    #[test]
    fn unrepresentable_expiry_is_a_signing_error() {
        let tokens = TokenIssuer::new(SECRET, u32::MAX);
        assert!(matches!(
            tokens.issue("user-1", "a@b.com"),
            Err(TokenError::Signing(_))
        ));
    }

    #[test]
    fn garbage_is_invalid() {
        assert!(matches!(issuer().verify("garbage"), Err(TokenError::Invalid(_))));
        assert!(matches!(issuer().verify(""), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn other_secret_is_invalid() {
        let token = TokenIssuer::new(b"another-secret-entirely-different", 7)
            .issue("user-1", "a@b.com")
            .unwrap();
        assert!(matches!(issuer().verify(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn tampered_payload_is_invalid() {
        let tokens = issuer();
        let token = tokens.issue("user-1", "a@b.com").unwrap();
        let forged = tokens.issue("user-2", "evil@b.com").unwrap();

        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_parts: Vec<&str> = forged.split('.').collect();
        parts[1] = forged_parts[1];
        let spliced = parts.join(".");

        assert!(matches!(tokens.verify(&spliced), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn claims_use_camel_case_user_id() {
        let json = serde_json::to_value(Claims {
            user_id: "u".into(),
            email: "e".into(),
            iat: 1,
            exp: 2,
        })
        .unwrap();
        assert!(json.get("userId").is_some());
    }
}
