//! Signature verification for session tokens.
//!
//! Tokens are issued by the identity provider; the gate only verifies them.
//! Time checks run against an injected `now` (see [`validate_claims`]) rather
//! than the library's own clock, so decisions stay deterministic under test.

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};

use crate::{SessionClaims, TokenValidationError, validate_claims};

/// Verifies a raw token and returns its claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenValidationError>;
}

/// Shared-secret (HS256) validator, used for development and tests.
pub struct Hs256JwtValidator {
    key: DecodingKey,
}

impl Hs256JwtValidator {
    pub fn new(secret: Vec<u8>) -> Self {
        Self {
            key: DecodingKey::from_secret(&secret),
        }
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenValidationError> {
        decode_session(token, &self.key, Algorithm::HS256, now)
    }
}

/// Public-key (RS256) validator matching the identity provider's signing key.
pub struct Rs256JwtValidator {
    key: DecodingKey,
}

impl Rs256JwtValidator {
    pub fn from_pem(pem: &[u8]) -> jsonwebtoken::errors::Result<Self> {
        Ok(Self {
            key: DecodingKey::from_rsa_pem(pem)?,
        })
    }
}

impl JwtValidator for Rs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenValidationError> {
        decode_session(token, &self.key, Algorithm::RS256, now)
    }
}

fn decode_session(
    token: &str,
    key: &DecodingKey,
    algorithm: Algorithm,
    now: DateTime<Utc>,
) -> Result<SessionClaims, TokenValidationError> {
    let mut validation = Validation::new(algorithm);
    // exp/iat are checked by `validate_claims` against the injected clock.
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.set_required_spec_claims(&["exp", "sub"]);

    let data = jsonwebtoken::decode::<SessionClaims>(token, key, &validation).map_err(|e| {
        tracing::debug!(error = %e, ?algorithm, "token decode failed");
        match e.kind() {
            ErrorKind::InvalidSignature => TokenValidationError::InvalidSignature,
            ErrorKind::ExpiredSignature => TokenValidationError::Expired,
            ErrorKind::ImmatureSignature => TokenValidationError::NotYetValid,
            _ => TokenValidationError::Malformed(e.to_string()),
        }
    })?;

    validate_claims(&data.claims, now)?;
    Ok(data.claims)
}
