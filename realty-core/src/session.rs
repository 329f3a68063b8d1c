//! Session tokens
//!
//! A session token is an HS256 JWT carrying the caller's `openId`, the
//! issuing application id and a display name. Tokens are never mutated:
//! logging in again mints a new one, logging out overwrites the cookie.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Session validity window in seconds (one year)
pub const SESSION_TTL_SECS: i64 = 365 * 24 * 60 * 60;

/// Session validity window
pub fn session_ttl() -> Duration {
    Duration::seconds(SESSION_TTL_SECS)
}

/// Identity claims carried by a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    pub open_id: String,
    pub app_id: String,
    pub name: String,
}

/// Wire form of the claims. Every field is optional on decode so that a
/// token missing a claim is rejected by us rather than by serde.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    open_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    app_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    exp: i64,
}

/// Signs and verifies session tokens with a shared secret
#[derive(Clone)]
pub struct SessionCodec {
    app_id: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for SessionCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCodec")
            .field("app_id", &self.app_id)
            .finish_non_exhaustive()
    }
}

impl SessionCodec {
    /// Create a codec. Fails if the secret is empty, since no authenticated
    /// request can be served without it.
    pub fn new(secret: &str, app_id: impl Into<String>) -> Result<Self> {
        if secret.trim().is_empty() {
            return Err(Error::MissingSecret);
        }

        Ok(Self {
            app_id: app_id.into(),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        })
    }

    /// The application id stamped into tokens minted by [`SessionCodec::issue`]
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Mint a token for a user of this application
    pub fn issue(&self, open_id: &str, name: &str, ttl: Duration) -> Result<String> {
        let claims = SessionClaims {
            open_id: open_id.to_string(),
            app_id: self.app_id.clone(),
            name: name.to_string(),
        };
        self.sign(&claims, ttl)
    }

    /// Sign claims that expire `ttl` from now
    pub fn sign(&self, claims: &SessionClaims, ttl: Duration) -> Result<String> {
        self.sign_at(claims, ttl, Utc::now())
    }

    /// Sign claims that expire `ttl` after `now`
    pub fn sign_at(
        &self,
        claims: &SessionClaims,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let payload = TokenPayload {
            open_id: Some(claims.open_id.clone()),
            app_id: Some(claims.app_id.clone()),
            name: Some(claims.name.clone()),
            exp: (now + ttl).timestamp(),
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &payload,
            &self.encoding_key,
        )?)
    }

    /// Verify a token against the current time.
    ///
    /// Returns `None` for anything that is not a valid, unexpired session;
    /// the reason is logged, never returned.
    pub fn verify(&self, token: &str) -> Option<SessionClaims> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a token as of `now`
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Option<SessionClaims> {
        if token.is_empty() {
            return None;
        }

        match self.decode_at(token, now) {
            Ok(claims) => Some(claims),
            Err(e) => {
                tracing::warn!(error = %e, "Session verification failed");
                None
            }
        }
    }

    fn decode_at(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims> {
        // Expiry is checked below so that the boundary is exact and testable
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;

        let payload = decode::<TokenPayload>(token, &self.decoding_key, &validation)?.claims;

        if now.timestamp() >= payload.exp {
            return Err(Error::TokenExpired);
        }

        let open_id = non_empty(payload.open_id, "openId")?;
        let app_id = non_empty(payload.app_id, "appId")?;
        let name = payload
            .name
            .ok_or_else(|| Error::InvalidToken("missing name claim".into()))?;

        Ok(SessionClaims {
            open_id,
            app_id,
            name,
        })
    }
}

fn non_empty(value: Option<String>, claim: &str) -> Result<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::InvalidToken(format!("missing {} claim", claim)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> SessionCodec {
        SessionCodec::new("test-secret", "app-1").unwrap()
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(matches!(
            SessionCodec::new("  ", "app"),
            Err(Error::MissingSecret)
        ));
    }

    #[test]
    fn test_issue_stamps_app_id() {
        let codec = codec();
        let token = codec.issue("u1", "Jane", Duration::hours(1)).unwrap();

        let claims = codec.verify(&token).unwrap();
        assert_eq!(claims.app_id, "app-1");
        assert_eq!(claims.open_id, "u1");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = codec().issue("u1", "Jane", Duration::hours(1)).unwrap();
        let other = SessionCodec::new("another-secret", "app-1").unwrap();

        assert!(other.verify(&token).is_none());
    }

    #[test]
    fn test_missing_open_id_rejected() {
        let codec = codec();
        let payload = TokenPayload {
            open_id: None,
            app_id: Some("app-1".into()),
            name: Some("Jane".into()),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &payload, &codec.encoding_key).unwrap();

        assert!(codec.verify(&token).is_none());
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(codec().verify("not.a.token").is_none());
        assert!(codec().verify("").is_none());
    }
}
