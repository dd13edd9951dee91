//! Policy configuration: the serialisable document and its validated form.
//!
//! The document is loaded once at startup and validated into a
//! [`PolicyConfig`]. Every [`ConfigError`] is fatal at startup; nothing here
//! can fail at request time.

use std::collections::{BTreeSet, HashSet};

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tollgate_auth::PlanId;

use crate::routes::{PublicRoutes, RouteProtectionRule, RoutePattern, RuleTable};

/// Upper bound on the claims TTL.
pub const MAX_TTL_SECS: u64 = 30 * 24 * 60 * 60;

pub const DEFAULT_TTL_SECS: u64 = 60 * 60;

/// What the gate does when a stale snapshot could not be refreshed.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradedMode {
    /// Decide on the stale snapshot.
    #[default]
    EvaluateStale,
    /// Return `Decision::Indeterminate` for entitlement-gated paths and let a
    /// check closer to the protected resource enforce.
    Defer,
}

/// Redirect targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedirectPaths {
    pub sign_in: String,
    pub onboarding: String,
    pub billing: String,
    pub landing: String,
}

impl Default for RedirectPaths {
    fn default() -> Self {
        Self {
            sign_in: "/sign-in".to_string(),
            onboarding: "/dashboard/onboarding".to_string(),
            billing: "/dashboard/billing".to_string(),
            landing: "/dashboard".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDocument {
    pub path_prefix: String,
    pub allowed_plans: Vec<String>,
}

/// On-disk (JSON) policy document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyDocument {
    pub public_routes: Vec<String>,
    pub rules: Vec<RuleDocument>,
    /// Prefixes that need any active subscription, whatever the plan.
    pub subscription_required: Vec<String>,
    pub paths: RedirectPaths,
    pub ttl_secs: u64,
    pub degraded_mode: DegradedMode,
}

impl Default for PolicyDocument {
    fn default() -> Self {
        let public_routes = [
            "/",
            "/sign-up(.*)",
            "/sign-in(.*)",
            "/pricing",
            "/about",
            "/contact",
            "/api/public(.*)",
        ];

        Self {
            public_routes: public_routes.iter().map(|p| p.to_string()).collect(),
            rules: vec![
                RuleDocument {
                    path_prefix: "/dashboard/notes".to_string(),
                    allowed_plans: vec!["Professional".to_string(), "Enterprise".to_string()],
                },
                RuleDocument {
                    path_prefix: "/dashboard/reports".to_string(),
                    allowed_plans: vec!["Enterprise".to_string()],
                },
            ],
            subscription_required: vec!["/api/notes".to_string()],
            paths: RedirectPaths::default(),
            ttl_secs: DEFAULT_TTL_SECS,
            degraded_mode: DegradedMode::default(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("rule for '{0}' has an empty allowed-plan set")]
    EmptyPlanSet(String),

    #[error("path '{0}' must start with '/'")]
    InvalidPath(String),

    #[error("duplicate rule for prefix '{0}'")]
    DuplicateRule(String),

    #[error("rule '{shadowed}' can never match: earlier rule '{by}' covers it")]
    ShadowedRule { shadowed: String, by: String },

    #[error("redirect target '{0}' is itself subscription-gated")]
    RedirectLoop(String),

    #[error("sign-in path '{0}' is not a public route")]
    SignInNotPublic(String),

    #[error("ttl must be between 1 and {MAX_TTL_SECS} seconds, got {0}")]
    InvalidTtl(u64),
}

/// Validated, immutable policy configuration.
///
/// Built once at process start and shared by reference with every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyConfig {
    public_routes: PublicRoutes,
    rules: RuleTable,
    subscription_required: Vec<String>,
    paths: RedirectPaths,
    ttl: Duration,
    degraded_mode: DegradedMode,
}

impl PolicyConfig {
    pub fn from_document(doc: PolicyDocument) -> Result<Self, ConfigError> {
        if doc.ttl_secs == 0 || doc.ttl_secs > MAX_TTL_SECS {
            return Err(ConfigError::InvalidTtl(doc.ttl_secs));
        }
        let ttl = Duration::seconds(doc.ttl_secs as i64);

        let mut patterns = Vec::with_capacity(doc.public_routes.len());
        for raw in &doc.public_routes {
            let pattern = RoutePattern::parse(raw);
            ensure_absolute(pattern.raw_path())?;
            patterns.push(pattern);
        }
        let public_routes = PublicRoutes::new(patterns);

        let mut seen = HashSet::new();
        let mut rules: Vec<RouteProtectionRule> = Vec::with_capacity(doc.rules.len());
        for rule in doc.rules {
            ensure_absolute(&rule.path_prefix)?;
            if rule.allowed_plans.is_empty() {
                return Err(ConfigError::EmptyPlanSet(rule.path_prefix));
            }
            if !seen.insert(rule.path_prefix.clone()) {
                return Err(ConfigError::DuplicateRule(rule.path_prefix));
            }
            if let Some(earlier) = rules.iter().find(|r| r.matches(&rule.path_prefix)) {
                return Err(ConfigError::ShadowedRule {
                    shadowed: rule.path_prefix,
                    by: earlier.path_prefix().to_string(),
                });
            }

            let allowed: BTreeSet<PlanId> = rule.allowed_plans.into_iter().map(PlanId::new).collect();
            rules.push(RouteProtectionRule::new(rule.path_prefix, allowed));
        }
        let rules = RuleTable::new(rules);

        for prefix in &doc.subscription_required {
            ensure_absolute(prefix)?;
        }

        let paths = doc.paths;
        for target in [&paths.sign_in, &paths.onboarding, &paths.billing, &paths.landing] {
            ensure_absolute(target)?;
        }
        if !public_routes.matches(&paths.sign_in) {
            return Err(ConfigError::SignInNotPublic(paths.sign_in));
        }

        let config = Self {
            public_routes,
            rules,
            subscription_required: doc.subscription_required,
            paths,
            ttl,
            degraded_mode: doc.degraded_mode,
        };

        let paths = &config.paths;
        for target in [&paths.sign_in, &paths.billing, &paths.onboarding, &paths.landing] {
            if config.requires_entitlement(target) {
                return Err(ConfigError::RedirectLoop(target.clone()));
            }
        }
        // Onboarding sends completed principals to landing and everyone else
        // away from non-onboarding paths; either target under it cycles.
        for target in [&paths.landing, &paths.billing] {
            if target.starts_with(paths.onboarding.as_str()) {
                return Err(ConfigError::RedirectLoop(target.clone()));
            }
        }

        Ok(config)
    }

    pub fn public_routes(&self) -> &PublicRoutes {
        &self.public_routes
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn subscription_required(&self) -> &[String] {
        &self.subscription_required
    }

    pub fn paths(&self) -> &RedirectPaths {
        &self.paths
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn degraded_mode(&self) -> DegradedMode {
        self.degraded_mode
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.public_routes.matches(path)
    }

    /// Whether `path` carries a generic "any active subscription" requirement.
    pub fn requires_any_subscription(&self, path: &str) -> bool {
        self.subscription_required
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Whether any subscription check applies to a non-public `path`.
    pub fn requires_entitlement(&self, path: &str) -> bool {
        self.rules.find(path).is_some() || self.requires_any_subscription(path)
    }
}

impl TryFrom<PolicyDocument> for PolicyConfig {
    type Error = ConfigError;

    fn try_from(doc: PolicyDocument) -> Result<Self, Self::Error> {
        Self::from_document(doc)
    }
}

fn ensure_absolute(path: &str) -> Result<(), ConfigError> {
    if path.starts_with('/') {
        Ok(())
    } else {
        Err(ConfigError::InvalidPath(path.to_string()))
    }
}
