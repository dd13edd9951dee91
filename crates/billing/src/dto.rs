use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tollgate_auth::{ClaimsSnapshot, PlanId, SubscriptionStatus, parse_timestamp};

/// Body of `GET /billing/subscription/current`.
///
/// Accepts the compact `{has_active_subscription, plan, end}` shape as well
/// as the backend's record shape `{status, plan_name, current_period_end}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentSubscription {
    #[serde(default)]
    pub has_active_subscription: Option<bool>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default, alias = "plan_name")]
    pub plan: Option<String>,

    #[serde(default, alias = "current_period_end")]
    pub end: Option<String>,
}

impl CurrentSubscription {
    /// Explicit `status` wins; a `has_active_subscription: false` always
    /// downgrades to inactive.
    pub fn status(&self) -> SubscriptionStatus {
        let status = match (&self.status, self.has_active_subscription) {
            (Some(raw), _) => SubscriptionStatus::parse(raw),
            (None, Some(true)) => SubscriptionStatus::Active,
            (None, Some(false)) => SubscriptionStatus::Inactive,
            (None, None) => SubscriptionStatus::None,
        };
        if self.has_active_subscription == Some(false) && status == SubscriptionStatus::Active {
            SubscriptionStatus::Inactive
        } else {
            status
        }
    }

    pub fn into_snapshot(self, checked_at: DateTime<Utc>) -> ClaimsSnapshot {
        let mut snapshot = ClaimsSnapshot::new(self.status()).with_last_checked(checked_at);
        if let Some(plan) = self.plan.filter(|p| !p.is_empty()) {
            snapshot = snapshot.with_plan(PlanId::new(plan));
        }
        if let Some(end) = self.end.as_deref().and_then(parse_timestamp) {
            snapshot = snapshot.with_end(end);
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_shape() {
        let body: CurrentSubscription = serde_json::from_str(
            r#"{"has_active_subscription": true, "plan": "Enterprise", "end": "2099-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        let now = Utc::now();
        let snapshot = body.into_snapshot(now);

        assert_eq!(snapshot.subscription_status(), SubscriptionStatus::Active);
        assert_eq!(snapshot.subscription_plan(), Some(&PlanId::new("Enterprise")));
        assert!(snapshot.subscription_end().is_some());
        assert_eq!(snapshot.last_checked(), Some(now));
    }

    #[test]
    fn record_shape() {
        let body: CurrentSubscription = serde_json::from_str(
            r#"{"id": 4, "status": "past_due", "plan_name": "Professional", "current_period_end": "2099-01-01T00:00:00"}"#,
        )
        .unwrap();
        assert_eq!(body.status(), SubscriptionStatus::Inactive);
        assert_eq!(body.plan.as_deref(), Some("Professional"));
    }

    #[test]
    fn negative_flag_overrides_active_status() {
        let body = CurrentSubscription {
            has_active_subscription: Some(false),
            status: Some("active".to_string()),
            ..CurrentSubscription::default()
        };
        assert_eq!(body.status(), SubscriptionStatus::Inactive);
    }
}
