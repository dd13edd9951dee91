//! Typed view of a principal's subscription state.
//!
//! Every field is explicitly optional and every absence has a documented
//! default. Nothing here is ever read as "truthy": a missing end date is
//! an expired subscription, a missing check time is a stale snapshot.

use std::borrow::Cow;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use tollgate_core::ValueObject;

/// Billing status as carried in token claims.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Inactive,
    /// Absent or unrecognised.
    None,
}

impl SubscriptionStatus {
    /// Billing statuses that mean "a subscription exists but grants nothing".
    const INACTIVE: &'static [&'static str] = &[
        "inactive",
        "canceled",
        "past_due",
        "unpaid",
        "incomplete",
        "incomplete_expired",
        "trialing",
        "paused",
    ];

    /// Parse a raw status string. Matching is exact; anything unknown is `None`.
    pub fn parse(raw: &str) -> Self {
        if raw == "active" {
            Self::Active
        } else if Self::INACTIVE.contains(&raw) {
            Self::Inactive
        } else {
            Self::None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::None => "none",
        }
    }
}

/// Plan identifier (e.g. `"Professional"`). Compared case-sensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanId(Cow<'static, str>);

impl PlanId {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for PlanId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl ValueObject for PlanId {}

/// Whether the principal has finished onboarding. Absent means incomplete.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Onboarding {
    Complete,
    Incomplete,
}

impl Onboarding {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl From<bool> for Onboarding {
    fn from(complete: bool) -> Self {
        if complete { Self::Complete } else { Self::Incomplete }
    }
}

/// Immutable snapshot of a principal's subscription state at one point in time.
///
/// Built once per request from token claims. A backend refresh yields a new
/// snapshot; there are no setters, only consuming `with_*` builders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimsSnapshot {
    subscription_status: SubscriptionStatus,
    subscription_plan: Option<PlanId>,
    subscription_end: Option<DateTime<Utc>>,
    last_checked: Option<DateTime<Utc>>,
}

impl ValueObject for ClaimsSnapshot {}

impl ClaimsSnapshot {
    pub fn new(subscription_status: SubscriptionStatus) -> Self {
        Self {
            subscription_status,
            subscription_plan: None,
            subscription_end: None,
            last_checked: None,
        }
    }

    /// Snapshot for a principal whose claims carry no subscription data at all.
    pub fn empty() -> Self {
        Self::new(SubscriptionStatus::None)
    }

    pub fn with_plan(mut self, plan: PlanId) -> Self {
        self.subscription_plan = Some(plan);
        self
    }

    pub fn with_end(mut self, end: DateTime<Utc>) -> Self {
        self.subscription_end = Some(end);
        self
    }

    pub fn with_last_checked(mut self, at: DateTime<Utc>) -> Self {
        self.last_checked = Some(at);
        self
    }

    pub fn subscription_status(&self) -> SubscriptionStatus {
        self.subscription_status
    }

    pub fn subscription_plan(&self) -> Option<&PlanId> {
        self.subscription_plan.as_ref()
    }

    pub fn subscription_end(&self) -> Option<DateTime<Utc>> {
        self.subscription_end
    }

    pub fn last_checked(&self) -> Option<DateTime<Utc>> {
        self.last_checked
    }

    /// End of the paid period; absent reads as the Unix epoch (already expired).
    pub fn effective_end(&self) -> DateTime<Utc> {
        self.subscription_end.unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// Last backend check; absent reads as the Unix epoch (always stale).
    pub fn effective_last_checked(&self) -> DateTime<Utc> {
        self.last_checked.unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }
}

/// Parse a claims timestamp.
///
/// Accepts RFC 3339, and naive ISO-8601 (no offset) which is read as UTC since
/// that is what the billing backend writes.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn status_parsing_is_exact() {
        assert_eq!(SubscriptionStatus::parse("active"), SubscriptionStatus::Active);
        assert_eq!(SubscriptionStatus::parse("canceled"), SubscriptionStatus::Inactive);
        assert_eq!(SubscriptionStatus::parse("past_due"), SubscriptionStatus::Inactive);
        assert_eq!(SubscriptionStatus::parse("Active"), SubscriptionStatus::None);
        assert_eq!(SubscriptionStatus::parse(""), SubscriptionStatus::None);
        assert_eq!(SubscriptionStatus::parse("gold"), SubscriptionStatus::None);
    }

    #[test]
    fn absent_timestamps_default_to_epoch() {
        let snapshot = ClaimsSnapshot::new(SubscriptionStatus::Active);
        assert_eq!(snapshot.effective_end(), DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(snapshot.effective_last_checked(), DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn builders_produce_new_values() {
        let now = Utc::now();
        let base = ClaimsSnapshot::new(SubscriptionStatus::Active);
        let refreshed = base
            .clone()
            .with_plan(PlanId::new("Enterprise"))
            .with_end(now + Duration::days(30))
            .with_last_checked(now);

        assert_eq!(base.subscription_plan(), None);
        assert_eq!(refreshed.subscription_plan(), Some(&PlanId::new("Enterprise")));
        assert_eq!(refreshed.last_checked(), Some(now));
        assert_ne!(base, refreshed);
    }

    #[test]
    fn parses_rfc3339_and_naive_timestamps() {
        let expected = Utc.with_ymd_and_hms(2025, 1, 31, 12, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2025-01-31T12:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2025-01-31T14:00:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-01-31T12:00:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2025-01-31T12:00:00.250000"),
            Some(expected + Duration::milliseconds(250))
        );
        assert_eq!(parse_timestamp("yesterday"), None);
    }
}
