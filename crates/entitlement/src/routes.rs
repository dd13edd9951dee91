//! Route matching: public patterns and the protection rule table.

use std::collections::BTreeSet;

use serde::Serialize;

use tollgate_auth::PlanId;

/// A public-route pattern.
///
/// Uses the identity provider's matcher syntax: a trailing `(.*)` matches any
/// path starting with what precedes it, anything else matches exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutePattern {
    Exact(String),
    Prefix(String),
}

impl RoutePattern {
    const WILDCARD_SUFFIX: &'static str = "(.*)";

    pub fn parse(raw: &str) -> Self {
        match raw.strip_suffix(Self::WILDCARD_SUFFIX) {
            Some(prefix) => Self::Prefix(prefix.to_string()),
            None => Self::Exact(raw.to_string()),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Exact(exact) => path == exact,
            Self::Prefix(prefix) => path.starts_with(prefix.as_str()),
        }
    }

    pub(crate) fn raw_path(&self) -> &str {
        match self {
            Self::Exact(p) | Self::Prefix(p) => p,
        }
    }
}

/// Routes that bypass every entitlement check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublicRoutes(Vec<RoutePattern>);

impl PublicRoutes {
    pub fn new(patterns: Vec<RoutePattern>) -> Self {
        Self(patterns)
    }

    pub fn matches(&self, path: &str) -> bool {
        self.0.iter().any(|p| p.matches(path))
    }

    pub fn patterns(&self) -> &[RoutePattern] {
        &self.0
    }
}

/// A path prefix that requires one of a set of plans.
///
/// Construct through [`crate::PolicyConfig`], which rejects empty plan sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteProtectionRule {
    path_prefix: String,
    allowed_plans: BTreeSet<PlanId>,
}

impl RouteProtectionRule {
    pub(crate) fn new(path_prefix: String, allowed_plans: BTreeSet<PlanId>) -> Self {
        Self {
            path_prefix,
            allowed_plans,
        }
    }

    pub fn path_prefix(&self) -> &str {
        &self.path_prefix
    }

    pub fn allowed_plans(&self) -> &BTreeSet<PlanId> {
        &self.allowed_plans
    }

    /// Case-sensitive prefix match.
    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(self.path_prefix.as_str())
    }

    /// Unknown or missing plans are never allowed.
    pub fn allows(&self, plan: Option<&PlanId>) -> bool {
        plan.is_some_and(|plan| self.allowed_plans.contains(plan))
    }
}

/// Ordered rule table; the first matching rule wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleTable(Vec<RouteProtectionRule>);

impl RuleTable {
    pub(crate) fn new(rules: Vec<RouteProtectionRule>) -> Self {
        Self(rules)
    }

    pub fn find(&self, path: &str) -> Option<&RouteProtectionRule> {
        self.0.iter().find(|rule| rule.matches(path))
    }

    pub fn rules(&self) -> &[RouteProtectionRule] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
