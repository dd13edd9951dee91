//! Per-request entitlement gate.
//!
//! Composes token validation, the freshness check, backend revalidation and
//! the pure policy into one decision, then maps that decision onto an admit
//! or a redirect. Framework-agnostic: the axum adapter lives in
//! [`crate::middleware`].
//!
//! ```text
//! Start ─┬─ PublicAllowed ───────────────────────────────────────► Admit
//!        ├─ Unauthenticated ─────────────────────────────────────► RedirectSignIn
//!        └─ StaleCheck ─┬─ RefreshOk ─────┬─ PolicyEvaluated ─┬─► Admit
//!                       └─ RefreshFailed ─┘                   ├─► RedirectOnboarding
//!                                                             └─► RedirectBilling(reason)
//! ```

use std::sync::Arc;

use serde::Serialize;

use tollgate_auth::{ClaimsSnapshot, JwtValidator, PrincipalId};
use tollgate_billing::{RefreshError, RevalidationClient};
use tollgate_core::Clock;
use tollgate_entitlement::{
    Decision, DegradedMode, Freshness, FreshnessGate, PolicyConfig, evaluate, evaluate_indeterminate,
};

/// What the gate needs to know about an inbound request.
#[derive(Debug, Clone, Copy)]
pub struct GateRequest<'a> {
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub token: Option<&'a str>,
}

/// Why a request was redirected. The billing reasons are distinct so the
/// billing page can explain each one.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectReason {
    Unauthenticated,
    Onboarding,
    OnboardingComplete,
    SubscriptionRequired,
    IncorrectPlan,
}

impl RedirectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Onboarding => "onboarding",
            Self::OnboardingComplete => "onboarding_complete",
            Self::SubscriptionRequired => "subscription_required",
            Self::IncorrectPlan => "incorrect_plan",
        }
    }
}

/// Where a redirect goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectTarget {
    /// Sign-in, remembering the original path and query.
    SignIn { return_to: String },
    Onboarding,
    Landing,
    /// Billing page with an `error` query parameter.
    Billing { error: &'static str },
}

/// An admitted request.
#[derive(Debug, Clone, PartialEq)]
pub struct Admission {
    pub principal_id: Option<PrincipalId>,
    pub decision: Decision,
    /// Set when a stale snapshot could not be refreshed. Observable for
    /// logging only.
    pub degraded: Option<RefreshError>,
    /// The snapshot the decision was made on (absent for public routes).
    pub snapshot: Option<ClaimsSnapshot>,
}

impl Admission {
    fn public() -> Self {
        Self {
            principal_id: None,
            decision: Decision::Admit,
            degraded: None,
            snapshot: None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
    Admit(Admission),
    Redirect {
        target: RedirectTarget,
        reason: RedirectReason,
    },
}

impl GateOutcome {
    pub fn is_admit(&self) -> bool {
        matches!(self, Self::Admit(_))
    }
}

/// The request-handling entry point.
///
/// Holds only immutable state: concurrent requests share it by reference and
/// never coordinate.
pub struct RouteGate<C> {
    config: Arc<PolicyConfig>,
    freshness: FreshnessGate,
    validator: Arc<dyn JwtValidator>,
    client: C,
    clock: Arc<dyn Clock>,
}

impl<C: RevalidationClient> RouteGate<C> {
    pub fn new(
        config: Arc<PolicyConfig>,
        validator: Arc<dyn JwtValidator>,
        client: C,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let freshness = FreshnessGate::new(config.ttl());
        Self {
            config,
            freshness,
            validator,
            client,
            clock,
        }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub async fn handle(&self, request: &GateRequest<'_>) -> GateOutcome {
        let path = request.path;
        let now = self.clock.now();

        if self.config.is_public(path) {
            tracing::debug!(path, "public route");
            return GateOutcome::Admit(Admission::public());
        }

        let Some(token) = request.token else {
            tracing::info!(path, "no session token; redirecting to sign-in");
            return sign_in(request);
        };

        let claims = match self.validator.validate(token, now) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::warn!(path, error = %e, "invalid session token; redirecting to sign-in");
                return sign_in(request);
            }
        };

        let principal_id = claims.sub.clone();
        let onboarding = claims.onboarding();
        let cancel_at_period_end = claims.public_metadata.cancel_at_period_end();
        let mut snapshot = claims.snapshot();
        let mut degraded = None;

        if self.freshness.check(&snapshot, now) == Freshness::Stale {
            match self.client.refresh(token).await {
                Ok(fresh) => {
                    tracing::debug!(principal_id = %principal_id, "stale claims refreshed");
                    snapshot = fresh;
                }
                Err(e) => {
                    tracing::error!(
                        principal_id = %principal_id,
                        path,
                        error = %e,
                        kind = e.kind(),
                        "claims refresh failed; continuing with stale snapshot"
                    );
                    degraded = Some(e);
                }
            }
        }

        let decision = match (&degraded, self.config.degraded_mode()) {
            (Some(_), DegradedMode::Defer) => evaluate_indeterminate(path, onboarding, &self.config),
            _ => evaluate(path, &snapshot, onboarding, &self.config, now),
        };

        let outcome = match decision {
            Decision::Admit | Decision::Indeterminate => GateOutcome::Admit(Admission {
                principal_id: Some(principal_id.clone()),
                decision,
                degraded,
                snapshot: Some(snapshot),
            }),
            Decision::RequireOnboarding => GateOutcome::Redirect {
                target: RedirectTarget::Onboarding,
                reason: RedirectReason::Onboarding,
            },
            Decision::RedirectToLanding => GateOutcome::Redirect {
                target: RedirectTarget::Landing,
                reason: RedirectReason::OnboardingComplete,
            },
            Decision::DenyNoSubscription => billing(RedirectReason::SubscriptionRequired),
            Decision::DenyIncorrectPlan => billing(RedirectReason::IncorrectPlan),
        };

        match &outcome {
            GateOutcome::Admit(admission) => tracing::debug!(
                principal_id = %principal_id,
                path,
                decision = %admission.decision,
                degraded = admission.is_degraded(),
                cancel_at_period_end,
                "admitted"
            ),
            GateOutcome::Redirect { reason, .. } => tracing::info!(
                principal_id = %principal_id,
                path,
                decision = %decision,
                reason = reason.as_str(),
                "redirected"
            ),
        }

        outcome
    }
}

fn sign_in(request: &GateRequest<'_>) -> GateOutcome {
    let return_to = match request.query {
        Some(query) if !query.is_empty() => format!("{}?{}", request.path, query),
        _ => request.path.to_string(),
    };
    GateOutcome::Redirect {
        target: RedirectTarget::SignIn { return_to },
        reason: RedirectReason::Unauthenticated,
    }
}

fn billing(reason: RedirectReason) -> GateOutcome {
    GateOutcome::Redirect {
        target: RedirectTarget::Billing { error: reason.as_str() },
        reason,
    }
}
