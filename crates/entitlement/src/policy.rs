//! Entitlement policy: `(path, snapshot, onboarding, config, now) -> Decision`.
//!
//! Evaluation order:
//! 1. public routes are admitted unconditionally;
//! 2. the first matching protection rule, else a generic "any active
//!    subscription" requirement, else no entitlement check at all;
//! 3. onboarding, checked only once entitlement has not denied.
//!
//! Expired or missing end dates are inactive, and unknown plans never match.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tollgate_auth::{ClaimsSnapshot, Onboarding, SubscriptionStatus};

use crate::config::PolicyConfig;
use crate::routes::RouteProtectionRule;

/// Outcome of a policy evaluation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Admit,
    DenyNoSubscription,
    DenyIncorrectPlan,
    RequireOnboarding,
    /// Onboarding is already complete: admit, but send the principal to the
    /// default landing page instead of the onboarding page.
    RedirectToLanding,
    /// Subscription state is unknown (backend unreachable); the caller's
    /// fail-open fallback applies.
    Indeterminate,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admit => "admit",
            Self::DenyNoSubscription => "deny_no_subscription",
            Self::DenyIncorrectPlan => "deny_incorrect_plan",
            Self::RequireOnboarding => "require_onboarding",
            Self::RedirectToLanding => "redirect_to_landing",
            Self::Indeterminate => "indeterminate",
        }
    }

    pub fn is_denial(&self) -> bool {
        matches!(self, Self::DenyNoSubscription | Self::DenyIncorrectPlan)
    }
}

impl core::fmt::Display for Decision {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The subscription requirement attached to a path.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Requirement<'a> {
    /// No entitlement check applies.
    None,
    /// Any active subscription suffices.
    AnyActive,
    /// An active subscription on one of the rule's plans.
    Plan(&'a RouteProtectionRule),
}

pub fn requirement_for<'a>(path: &str, config: &'a PolicyConfig) -> Requirement<'a> {
    if let Some(rule) = config.rules().find(path) {
        Requirement::Plan(rule)
    } else if config.requires_any_subscription(path) {
        Requirement::AnyActive
    } else {
        Requirement::None
    }
}

/// Active means status `active` *and* an end date strictly in the future.
pub fn is_active(snapshot: &ClaimsSnapshot, now: DateTime<Utc>) -> bool {
    snapshot.subscription_status() == SubscriptionStatus::Active && snapshot.effective_end() > now
}

/// Evaluate a request path against a snapshot. Pure and deterministic.
pub fn evaluate(
    path: &str,
    snapshot: &ClaimsSnapshot,
    onboarding: Onboarding,
    config: &PolicyConfig,
    now: DateTime<Utc>,
) -> Decision {
    decide(path, Subject::Known { snapshot, now }, onboarding, config)
}

/// Evaluate without subscription knowledge.
///
/// Entitlement-gated paths yield [`Decision::Indeterminate`]; public routes and
/// onboarding redirects behave exactly as in [`evaluate`].
pub fn evaluate_indeterminate(path: &str, onboarding: Onboarding, config: &PolicyConfig) -> Decision {
    decide(path, Subject::Unknown, onboarding, config)
}

enum Subject<'a> {
    Known {
        snapshot: &'a ClaimsSnapshot,
        now: DateTime<Utc>,
    },
    Unknown,
}

enum Entitlement {
    NotRequired,
    Granted,
    Denied(Decision),
    Unknown,
}

fn decide(path: &str, subject: Subject<'_>, onboarding: Onboarding, config: &PolicyConfig) -> Decision {
    if config.is_public(path) {
        return Decision::Admit;
    }

    let entitlement = check_entitlement(requirement_for(path, config), &subject);
    if let Entitlement::Denied(decision) = entitlement {
        return decision;
    }

    if let Some(decision) = check_onboarding(path, onboarding, config) {
        return decision;
    }

    match entitlement {
        Entitlement::Unknown => Decision::Indeterminate,
        _ => Decision::Admit,
    }
}

fn check_entitlement(requirement: Requirement<'_>, subject: &Subject<'_>) -> Entitlement {
    if requirement == Requirement::None {
        return Entitlement::NotRequired;
    }
    let Subject::Known { snapshot, now } = subject else {
        return Entitlement::Unknown;
    };

    if !is_active(snapshot, *now) {
        return Entitlement::Denied(Decision::DenyNoSubscription);
    }
    match requirement {
        Requirement::Plan(rule) if !rule.allows(snapshot.subscription_plan()) => {
            Entitlement::Denied(Decision::DenyIncorrectPlan)
        }
        _ => Entitlement::Granted,
    }
}

fn check_onboarding(path: &str, onboarding: Onboarding, config: &PolicyConfig) -> Option<Decision> {
    let on_onboarding_path = path.starts_with(config.paths().onboarding.as_str());
    match (onboarding, on_onboarding_path) {
        (Onboarding::Incomplete, false) => Some(Decision::RequireOnboarding),
        (Onboarding::Complete, true) => Some(Decision::RedirectToLanding),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PolicyDocument, RuleDocument};
    use chrono::Duration;
    use proptest::prelude::*;
    use tollgate_auth::PlanId;

    fn config() -> PolicyConfig {
        PolicyConfig::from_document(PolicyDocument {
            rules: vec![
                RuleDocument {
                    path_prefix: "/dashboard/reports".to_string(),
                    allowed_plans: vec!["Enterprise".to_string()],
                },
                RuleDocument {
                    path_prefix: "/dashboard/notes".to_string(),
                    allowed_plans: vec!["Professional".to_string(), "Enterprise".to_string()],
                },
            ],
            ..PolicyDocument::default()
        })
        .unwrap()
    }

    fn active(plan: &'static str, now: DateTime<Utc>) -> ClaimsSnapshot {
        ClaimsSnapshot::new(SubscriptionStatus::Active)
            .with_plan(PlanId::new(plan))
            .with_end(now + Duration::days(30))
            .with_last_checked(now)
    }

    #[test]
    fn professional_plan_is_denied_enterprise_reports() {
        let now = Utc::now();
        let decision = evaluate(
            "/dashboard/reports",
            &active("Professional", now),
            Onboarding::Complete,
            &config(),
            now,
        );
        assert_eq!(decision, Decision::DenyIncorrectPlan);
    }

    #[test]
    fn inactive_subscription_is_denied_notes() {
        let now = Utc::now();
        let snapshot = ClaimsSnapshot::new(SubscriptionStatus::Inactive);
        let decision = evaluate("/dashboard/notes", &snapshot, Onboarding::Complete, &config(), now);
        assert_eq!(decision, Decision::DenyNoSubscription);
    }

    #[test]
    fn enterprise_plan_is_admitted_to_notes() {
        let now = Utc::now();
        let decision = evaluate(
            "/dashboard/notes",
            &active("Enterprise", now),
            Onboarding::Complete,
            &config(),
            now,
        );
        assert_eq!(decision, Decision::Admit);
    }

    #[test]
    fn expired_active_subscription_is_inactive() {
        let now = Utc::now();
        let snapshot = ClaimsSnapshot::new(SubscriptionStatus::Active)
            .with_plan(PlanId::new("Enterprise"))
            .with_end(now - Duration::seconds(1));
        assert!(!is_active(&snapshot, now));
        assert_eq!(
            evaluate("/dashboard/notes", &snapshot, Onboarding::Complete, &config(), now),
            Decision::DenyNoSubscription
        );

        let no_end = ClaimsSnapshot::new(SubscriptionStatus::Active).with_plan(PlanId::new("Enterprise"));
        assert!(!is_active(&no_end, now));
    }

    #[test]
    fn unknown_plan_is_incorrect_plan() {
        let now = Utc::now();
        let decision = evaluate(
            "/dashboard/notes",
            &active("Platinum", now),
            Onboarding::Complete,
            &config(),
            now,
        );
        assert_eq!(decision, Decision::DenyIncorrectPlan);
    }

    #[test]
    fn generic_requirement_admits_any_active_plan() {
        let now = Utc::now();
        let config = config();
        assert_eq!(
            evaluate("/api/notes/1", &active("Starter", now), Onboarding::Complete, &config, now),
            Decision::Admit
        );
        assert_eq!(
            evaluate("/api/notes/1", &ClaimsSnapshot::empty(), Onboarding::Complete, &config, now),
            Decision::DenyNoSubscription
        );
    }

    #[test]
    fn unprotected_path_needs_no_subscription() {
        let now = Utc::now();
        let decision = evaluate("/dashboard", &ClaimsSnapshot::empty(), Onboarding::Complete, &config(), now);
        assert_eq!(decision, Decision::Admit);
    }

    #[test]
    fn onboarding_redirects() {
        let now = Utc::now();
        let config = config();
        let snapshot = ClaimsSnapshot::empty();

        assert_eq!(
            evaluate("/dashboard/billing", &snapshot, Onboarding::Incomplete, &config, now),
            Decision::RequireOnboarding
        );
        assert_eq!(
            evaluate("/dashboard/onboarding", &snapshot, Onboarding::Incomplete, &config, now),
            Decision::Admit
        );
        assert_eq!(
            evaluate("/dashboard/onboarding", &snapshot, Onboarding::Complete, &config, now),
            Decision::RedirectToLanding
        );
    }

    #[test]
    fn entitlement_denial_precedes_onboarding() {
        let now = Utc::now();
        let decision = evaluate(
            "/dashboard/notes",
            &ClaimsSnapshot::empty(),
            Onboarding::Incomplete,
            &config(),
            now,
        );
        assert_eq!(decision, Decision::DenyNoSubscription);
    }

    #[test]
    fn indeterminate_only_for_gated_paths() {
        let config = config();
        assert_eq!(
            evaluate_indeterminate("/dashboard/reports", Onboarding::Complete, &config),
            Decision::Indeterminate
        );
        assert_eq!(
            evaluate_indeterminate("/dashboard/reports", Onboarding::Incomplete, &config),
            Decision::RequireOnboarding
        );
        assert_eq!(
            evaluate_indeterminate("/dashboard", Onboarding::Complete, &config),
            Decision::Admit
        );
        assert_eq!(
            evaluate_indeterminate("/pricing", Onboarding::Incomplete, &config),
            Decision::Admit
        );
    }

    fn any_status() -> impl Strategy<Value = SubscriptionStatus> {
        prop_oneof![
            Just(SubscriptionStatus::Active),
            Just(SubscriptionStatus::Inactive),
            Just(SubscriptionStatus::None),
        ]
    }

    fn any_snapshot() -> impl Strategy<Value = ClaimsSnapshot> {
        (
            any_status(),
            proptest::option::of("[A-Za-z]{1,12}"),
            proptest::option::of(-100_000i64..100_000),
        )
            .prop_map(|(status, plan, end_offset)| {
                let now = Utc::now();
                let mut snapshot = ClaimsSnapshot::new(status);
                if let Some(plan) = plan {
                    snapshot = snapshot.with_plan(PlanId::new(plan));
                }
                if let Some(offset) = end_offset {
                    snapshot = snapshot.with_end(now + Duration::seconds(offset));
                }
                snapshot
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: an end date in the past (or absent) is never active.
        #[test]
        fn expiry_defaults_closed(status in any_status(), past_secs in proptest::option::of(0i64..10_000_000)) {
            let now = Utc::now();
            let mut snapshot = ClaimsSnapshot::new(status).with_plan(PlanId::new("Enterprise"));
            if let Some(secs) = past_secs {
                snapshot = snapshot.with_end(now - Duration::seconds(secs));
            }
            prop_assert!(!is_active(&snapshot, now));
        }

        /// Property: public routes are admitted whatever the snapshot says.
        #[test]
        fn public_routes_are_open(
            snapshot in any_snapshot(),
            complete in any::<bool>(),
            path in prop_oneof![
                Just("/".to_string()),
                Just("/pricing".to_string()),
                "/sign-in[a-z/]{0,12}",
                "/api/public[a-z/]{0,12}",
            ],
        ) {
            let decision = evaluate(&path, &snapshot, complete.into(), &config(), Utc::now());
            prop_assert_eq!(decision, Decision::Admit);
        }

        /// Property: evaluation is a pure function of its inputs.
        #[test]
        fn evaluation_is_idempotent(
            snapshot in any_snapshot(),
            complete in any::<bool>(),
            path in "/[a-z]{0,10}(/[a-z]{0,10})?",
        ) {
            let config = config();
            let now = Utc::now();
            let first = evaluate(&path, &snapshot, complete.into(), &config, now);
            let second = evaluate(&path, &snapshot, complete.into(), &config, now);
            prop_assert_eq!(first, second);
        }
    }
}
