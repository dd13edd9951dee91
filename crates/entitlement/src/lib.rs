//! `tollgate-entitlement`: the pure entitlement decision procedure.
//!
//! No IO, no clocks, no shared mutable state: every function here takes the
//! current time and the immutable [`PolicyConfig`] as arguments.

pub mod config;
pub mod freshness;
pub mod policy;
pub mod routes;

pub use config::{ConfigError, DegradedMode, PolicyConfig, PolicyDocument, RedirectPaths, RuleDocument};
pub use freshness::{Freshness, FreshnessGate, is_stale};
pub use policy::{Decision, Requirement, evaluate, evaluate_indeterminate, is_active, requirement_for};
pub use routes::{PublicRoutes, RouteProtectionRule, RoutePattern, RuleTable};
