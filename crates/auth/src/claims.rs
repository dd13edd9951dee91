use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::snapshot::parse_timestamp;
use crate::{ClaimsSnapshot, Onboarding, PlanId, PrincipalId, SubscriptionStatus};

/// Clock skew tolerated between the identity provider and this process, in seconds.
pub const CLOCK_SKEW_LEEWAY_SECS: i64 = 5;

/// Session token claims (transport-agnostic).
///
/// This is the subset of the identity provider's session token that the gate
/// reads once the signature has been verified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject / principal identifier.
    pub sub: PrincipalId,

    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,

    /// Expiration, seconds since the Unix epoch.
    pub exp: i64,

    /// Application metadata the billing backend writes into the user record.
    #[serde(default, rename = "publicMetadata", alias = "public_metadata")]
    pub public_metadata: PublicMetadata,
}

impl SessionClaims {
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.iat, 0)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// Build the subscription snapshot carried by these claims.
    pub fn snapshot(&self) -> ClaimsSnapshot {
        self.public_metadata.snapshot()
    }

    pub fn onboarding(&self) -> Onboarding {
        self.public_metadata.onboarding()
    }
}

/// Loosely-typed metadata map embedded in the token.
///
/// Fields are read through typed accessors; a field with the wrong JSON type
/// is treated exactly like an absent one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicMetadata(Map<String, Value>);

impl PublicMetadata {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    fn timestamp_field(&self, key: &str) -> Option<DateTime<Utc>> {
        self.str_field(key).and_then(parse_timestamp)
    }

    pub fn subscription_status(&self) -> SubscriptionStatus {
        self.str_field("subscription_status")
            .map(SubscriptionStatus::parse)
            .unwrap_or(SubscriptionStatus::None)
    }

    pub fn subscription_plan(&self) -> Option<PlanId> {
        self.str_field("subscription_plan")
            .filter(|plan| !plan.is_empty())
            .map(|plan| PlanId::new(plan.to_string()))
    }

    pub fn subscription_end(&self) -> Option<DateTime<Utc>> {
        self.timestamp_field("subscription_end")
    }

    pub fn last_checked(&self) -> Option<DateTime<Utc>> {
        self.timestamp_field("last_checked")
    }

    /// Informational only: the subscription lapses at `subscription_end` anyway.
    pub fn cancel_at_period_end(&self) -> bool {
        self.0
            .get("cancel_at_period_end")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn onboarding(&self) -> Onboarding {
        self.0
            .get("onboardingComplete")
            .and_then(Value::as_bool)
            .unwrap_or(false)
            .into()
    }

    pub fn snapshot(&self) -> ClaimsSnapshot {
        let mut snapshot = ClaimsSnapshot::new(self.subscription_status());
        if let Some(plan) = self.subscription_plan() {
            snapshot = snapshot.with_plan(plan);
        }
        if let Some(end) = self.subscription_end() {
            snapshot = snapshot.with_end(end);
        }
        if let Some(at) = self.last_checked() {
            snapshot = snapshot.with_last_checked(at);
        }
        snapshot
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token subject is empty")]
    MissingSubject,

    #[error("malformed token: {0}")]
    Malformed(String),
}

/// Deterministically validate session claims against `now`.
///
/// Signature verification happens before this, in the [`crate::JwtValidator`].
pub fn validate_claims(claims: &SessionClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.sub.as_str().is_empty() {
        return Err(TokenValidationError::MissingSubject);
    }
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    let (Some(issued_at), Some(expires_at)) = (claims.issued_at(), claims.expires_at()) else {
        return Err(TokenValidationError::InvalidTimeWindow);
    };
    let leeway = Duration::seconds(CLOCK_SKEW_LEEWAY_SECS);
    if now + leeway < issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= expires_at + leeway {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}
