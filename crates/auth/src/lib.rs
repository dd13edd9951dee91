//! `tollgate-auth`: token and claims boundary.
//!
//! This crate is intentionally decoupled from HTTP and from the billing
//! backend: it turns an opaque signed token into typed claims and a
//! [`ClaimsSnapshot`], nothing more.

pub mod claims;
pub mod jwt;
pub mod principal;
pub mod snapshot;

pub use claims::{PublicMetadata, SessionClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator, Rs256JwtValidator};
pub use principal::PrincipalId;
pub use snapshot::{ClaimsSnapshot, Onboarding, PlanId, SubscriptionStatus, parse_timestamp};
