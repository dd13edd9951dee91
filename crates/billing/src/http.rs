//! HTTP implementation of [`RevalidationClient`] against the billing API.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;

use tollgate_auth::ClaimsSnapshot;
use tollgate_core::{Clock, SystemClock};

use crate::{CurrentSubscription, RefreshError, RevalidationClient};

const UPDATE_METADATA_PATH: &str = "/billing/subscription/update-metadata";
const CURRENT_SUBSCRIPTION_PATH: &str = "/billing/subscription/current";

/// Billing API client.
///
/// A refresh is two calls on one connection pool:
/// 1. `POST update-metadata` asks the backend to push fresh subscription
///    metadata into the identity provider's user record;
/// 2. `GET current` returns the subscription the new snapshot is built from.
pub struct HttpRevalidationClient {
    http: reqwest::Client,
    base_url: String,
    clock: Arc<dyn Clock>,
}

impl HttpRevalidationClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        Self::with_clock(base_url, timeout, Arc::new(SystemClock::new()))
    }

    pub fn with_clock(
        base_url: impl Into<String>,
        timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url, clock })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn request_metadata_update(&self, token: &str) -> Result<(), RefreshError> {
        let url = format!("{}{}", self.base_url, UPDATE_METADATA_PATH);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport_error)?;

        match resp.status() {
            // Nothing to push yet; the GET below still reports "no subscription".
            StatusCode::NOT_FOUND => Ok(()),
            status if status.is_success() => Ok(()),
            status => Err(status_error(status)),
        }
    }

    async fn fetch_current(&self, token: &str) -> Result<ClaimsSnapshot, RefreshError> {
        let url = format!("{}{}", self.base_url, CURRENT_SUBSCRIPTION_PATH);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport_error)?;

        let checked_at = self.clock.now();
        match resp.status() {
            StatusCode::NOT_FOUND => Ok(ClaimsSnapshot::empty().with_last_checked(checked_at)),
            status if status.is_success() => {
                let body: CurrentSubscription = resp
                    .json()
                    .await
                    .map_err(|e| RefreshError::Malformed(e.to_string()))?;
                Ok(body.into_snapshot(checked_at))
            }
            status => Err(status_error(status)),
        }
    }
}

#[async_trait::async_trait]
impl RevalidationClient for HttpRevalidationClient {
    async fn refresh(&self, token: &str) -> Result<ClaimsSnapshot, RefreshError> {
        self.request_metadata_update(token).await?;
        let snapshot = self.fetch_current(token).await?;
        tracing::debug!(
            status = snapshot.subscription_status().as_str(),
            plan = snapshot.subscription_plan().map(|p| p.as_str()),
            "subscription revalidated"
        );
        Ok(snapshot)
    }
}

fn transport_error(err: reqwest::Error) -> RefreshError {
    if err.is_decode() {
        RefreshError::Malformed(err.to_string())
    } else {
        RefreshError::Unreachable(err.to_string())
    }
}

fn status_error(status: StatusCode) -> RefreshError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RefreshError::Unauthorized,
        s if s.is_server_error() => RefreshError::Unreachable(format!("backend returned {s}")),
        s => RefreshError::Malformed(format!("unexpected status {s}")),
    }
}
