//! Claims cache freshness.
//!
//! Bounds backend calls to at most one per principal per TTL window, at the
//! price of entitlement data up to one TTL old.

use chrono::{DateTime, Duration, Utc};

use tollgate_auth::ClaimsSnapshot;
use tollgate_auth::claims::CLOCK_SKEW_LEEWAY_SECS;

/// Stale if `last_checked` is absent, strictly more than `ttl` ago, or further
/// in the future than the clock-skew leeway.
pub fn is_stale(last_checked: Option<DateTime<Utc>>, now: DateTime<Utc>, ttl: Duration) -> bool {
    let Some(at) = last_checked else {
        return true;
    };
    let age = now.signed_duration_since(at);
    age > ttl || age < -Duration::seconds(CLOCK_SKEW_LEEWAY_SECS)
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Stale,
}

/// [`is_stale`] bound to a fixed TTL.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FreshnessGate {
    ttl: Duration,
}

impl FreshnessGate {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn check(&self, snapshot: &ClaimsSnapshot, now: DateTime<Utc>) -> Freshness {
        if is_stale(snapshot.last_checked(), now, self.ttl) {
            Freshness::Stale
        } else {
            Freshness::Fresh
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tollgate_auth::SubscriptionStatus;

    #[test]
    fn missing_last_checked_is_stale() {
        assert!(is_stale(None, Utc::now(), Duration::hours(1)));
    }

    #[test]
    fn boundary_is_inclusive_of_ttl() {
        let now = Utc::now();
        let ttl = Duration::hours(1);
        assert!(!is_stale(Some(now - ttl), now, ttl));
        assert!(is_stale(Some(now - ttl - Duration::milliseconds(1)), now, ttl));
    }

    #[test]
    fn future_check_beyond_leeway_is_stale() {
        let now = Utc::now();
        let ttl = Duration::hours(1);
        let leeway = Duration::seconds(CLOCK_SKEW_LEEWAY_SECS);
        assert!(!is_stale(Some(now + leeway), now, ttl));
        assert!(is_stale(Some(now + leeway + Duration::milliseconds(1)), now, ttl));
        assert!(is_stale(Some(now + Duration::days(365)), now, ttl));
    }

    #[test]
    fn gate_reports_stale_for_two_hour_old_snapshot() {
        let now = Utc::now();
        let gate = FreshnessGate::new(Duration::hours(1));
        let snapshot = ClaimsSnapshot::new(SubscriptionStatus::Active).with_last_checked(now - Duration::hours(2));
        assert_eq!(gate.check(&snapshot, now), Freshness::Stale);

        let snapshot = snapshot.with_last_checked(now - Duration::minutes(5));
        assert_eq!(gate.check(&snapshot, now), Freshness::Fresh);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: age within the TTL is fresh, age beyond it is stale.
        #[test]
        fn staleness_tracks_ttl(age_secs in 0i64..200_000, ttl_secs in 1i64..100_000) {
            let now = Utc::now();
            let ttl = Duration::seconds(ttl_secs);
            let last_checked = now - Duration::seconds(age_secs);

            prop_assert_eq!(is_stale(Some(last_checked), now, ttl), age_secs > ttl_secs);
        }
    }
}
