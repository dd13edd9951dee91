//! Revalidation port and its timeout wrapper.

use std::sync::Arc;
use std::time::Duration;

use tollgate_auth::ClaimsSnapshot;

use crate::RefreshError;

/// Fetches current subscription truth for the bearer of `token`.
///
/// One call is one backend round trip; implementations never retry. On
/// success the backend is also expected to update the identity provider's
/// stored claims, so the principal's next token carries the fresh values.
#[async_trait::async_trait]
pub trait RevalidationClient: Send + Sync {
    async fn refresh(&self, token: &str) -> Result<ClaimsSnapshot, RefreshError>;
}

#[async_trait::async_trait]
impl<C: RevalidationClient + ?Sized> RevalidationClient for Arc<C> {
    async fn refresh(&self, token: &str) -> Result<ClaimsSnapshot, RefreshError> {
        (**self).refresh(token).await
    }
}

/// Bounds any client by a hard deadline. An elapsed deadline is `Unreachable`.
///
/// Dropping the returned future (e.g. because the enclosing request was
/// aborted) drops the in-flight call with it.
#[derive(Debug, Clone)]
pub struct Bounded<C> {
    inner: C,
    timeout: Duration,
}

impl<C> Bounded<C> {
    pub fn new(inner: C, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait::async_trait]
impl<C: RevalidationClient> RevalidationClient for Bounded<C> {
    async fn refresh(&self, token: &str) -> Result<ClaimsSnapshot, RefreshError> {
        match tokio::time::timeout(self.timeout, self.inner.refresh(token)).await {
            Ok(result) => result,
            Err(_) => Err(RefreshError::Unreachable(format!(
                "no response within {}ms",
                self.timeout.as_millis()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_auth::SubscriptionStatus;

    struct SlowClient(Duration);

    #[async_trait::async_trait]
    impl RevalidationClient for SlowClient {
        async fn refresh(&self, _token: &str) -> Result<ClaimsSnapshot, RefreshError> {
            tokio::time::sleep(self.0).await;
            Ok(ClaimsSnapshot::new(SubscriptionStatus::Active))
        }
    }

    #[tokio::test]
    async fn fast_inner_result_passes_through() {
        let client = Bounded::new(SlowClient(Duration::from_millis(1)), Duration::from_secs(1));
        let snapshot = client.refresh("token").await.unwrap();
        assert_eq!(snapshot.subscription_status(), SubscriptionStatus::Active);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_reports_unreachable() {
        let client = Bounded::new(SlowClient(Duration::from_secs(30)), Duration::from_millis(50));
        let err = client.refresh("token").await.unwrap_err();
        assert!(matches!(err, RefreshError::Unreachable(_)));
        assert_eq!(err.kind(), "unreachable");
    }
}
