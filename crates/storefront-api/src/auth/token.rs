//! Signed bearer tokens
//!
//! HS256 JWTs carrying the user id as `sub`. Expiry is checked against a
//! caller-supplied `now` rather than the wall clock, so decoding is a pure
//! function of its inputs.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use storefront_core::AuthConfig;
use thiserror::Error;
use uuid::Uuid;

/// JWT claims embedded in every token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Token issuer
    pub iss: String,
    /// Subject - user ID
    pub sub: String,
    /// Random token ID, keeps tokens issued in the same second distinct
    pub jti: String,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiration (Unix seconds)
    pub exp: i64,
}

/// Token encoding and decoding errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,

    #[error("Invalid token")]
    Malformed,

    #[error("Failed to sign token: {0}")]
    Signing(String),
}

/// HMAC-SHA256 token codec bound to one secret and issuer
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(secret: &[u8], issuer: impl Into<String>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.secret.as_bytes(), config.issuer.clone())
    }

    /// Issue a token for `subject` valid from `now` until `now + ttl`
    pub fn encode(
        &self,
        subject: Uuid,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| TokenError::Signing("token expiry out of range".to_string()))?;

        let claims = Claims {
            iss: self.issuer.clone(),
            sub: subject.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify `token` and return its subject
    ///
    /// The signature is checked before any claim is looked at. A forged
    /// token is `Malformed` even when its claimed expiry has passed.
    pub fn decode(&self, token: &str, now: DateTime<Utc>) -> Result<Uuid, TokenError> {
        let claims = self.verify(token)?;

        if now.timestamp() > claims.exp {
            return Err(TokenError::Expired);
        }

        Uuid::parse_str(&claims.sub).map_err(|_| TokenError::Malformed)
    }

    fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is compared against the caller's clock in `decode`
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);
        validation.set_issuer(&[&self.issuer]);

        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "token verification failed");
                TokenError::Malformed
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn codec() -> TokenCodec {
        TokenCodec::new(b"test-secret", "storefront")
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn test_encode_then_decode_returns_subject() {
        let codec = codec();
        let subject = Uuid::new_v4();
        let now = at(1_700_000_000);

        let token = codec.encode(subject, now, Duration::seconds(5)).unwrap();
        assert_eq!(codec.decode(&token, now), Ok(subject));
    }

    #[test]
    fn test_expiry_boundary() {
        let codec = codec();
        let now = at(1_700_000_000);
        let token = codec
            .encode(Uuid::new_v4(), now, Duration::seconds(5))
            .unwrap();

        // now == exp is still valid; one second later is not
        assert!(codec.decode(&token, at(1_700_000_005)).is_ok());
        assert_eq!(
            codec.decode(&token, at(1_700_000_006)),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_wrong_secret_is_malformed() {
        let token = codec()
            .encode(Uuid::new_v4(), at(1_700_000_000), Duration::seconds(60))
            .unwrap();
        let other = TokenCodec::new(b"other-secret", "storefront");

        assert_eq!(
            other.decode(&token, at(1_700_000_000)),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn test_forged_expired_token_is_malformed() {
        let token = TokenCodec::new(b"attacker", "storefront")
            .encode(Uuid::new_v4(), at(1_000), Duration::seconds(1))
            .unwrap();

        assert_eq!(
            codec().decode(&token, at(1_700_000_000)),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn test_tampered_payload_is_malformed() {
        let codec = codec();
        let now = at(1_700_000_000);
        let token = codec.encode(Uuid::new_v4(), now, Duration::seconds(60)).unwrap();

        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_payload = token
            .split('.')
            .nth(1)
            .unwrap()
            .chars()
            .rev()
            .collect::<String>();
        parts[1] = &forged_payload;
        let tampered = parts.join(".");

        assert_eq!(codec.decode(&tampered, now), Err(TokenError::Malformed));
    }

    #[test]
    fn test_garbage_and_wrong_issuer_are_malformed() {
        let now = at(1_700_000_000);
        assert_eq!(codec().decode("", now), Err(TokenError::Malformed));
        assert_eq!(
            codec().decode("not.a.token", now),
            Err(TokenError::Malformed)
        );

        let foreign = TokenCodec::new(b"test-secret", "someone-else")
            .encode(Uuid::new_v4(), now, Duration::seconds(60))
            .unwrap();
        assert_eq!(codec().decode(&foreign, now), Err(TokenError::Malformed));
    }

    #[test]
    fn test_same_subject_same_instant_gives_distinct_tokens() {
        let codec = codec();
        let subject = Uuid::new_v4();
        let now = at(1_700_000_000);

        let first = codec.encode(subject, now, Duration::seconds(60)).unwrap();
        let second = codec.encode(subject, now, Duration::seconds(60)).unwrap();

        assert_ne!(first, second);
        assert_eq!(codec.decode(&first, now), Ok(subject));
        assert_eq!(codec.decode(&second, now), Ok(subject));
    }

    proptest! {
        #[test]
        fn prop_round_trip(
            bytes in any::<u128>(),
            issued in 0i64..4_000_000_000,
            ttl in 0i64..1_000_000,
        ) {
            let codec = codec();
            let subject = Uuid::from_u128(bytes);
            let now = at(issued);

            let token = codec.encode(subject, now, Duration::seconds(ttl)).unwrap();
            prop_assert_eq!(codec.decode(&token, now), Ok(subject));
        }

        #[test]
        fn prop_expired_after_ttl(
            issued in 0i64..4_000_000_000,
            ttl in 0i64..1_000_000,
            late_by in 1i64..1_000_000,
        ) {
            let codec = codec();
            let token = codec
                .encode(Uuid::new_v4(), at(issued), Duration::seconds(ttl))
                .unwrap();

            prop_assert_eq!(
                codec.decode(&token, at(issued + ttl + late_by)),
                Err(TokenError::Expired)
            );
        }
    }
}
