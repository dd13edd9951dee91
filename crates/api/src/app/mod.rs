//! Axum router wiring.
//!
//! - `routes/`: handlers that sit behind the gate
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Router, routing::get};
use tower::ServiceBuilder;

use tollgate_auth::{Hs256JwtValidator, JwtValidator, Rs256JwtValidator};
use tollgate_billing::{Bounded, HttpRevalidationClient, RevalidationClient};
use tollgate_core::{Clock, SystemClock};

use crate::config::{JwtKey, Settings};
use crate::gate::RouteGate;
use crate::middleware::{self, GateState};
use crate::redirect::RedirectBuilder;

pub mod errors;
pub mod routes;

/// Build the production router from settings.
pub fn build_app(settings: Settings) -> anyhow::Result<Router> {
    let validator: Arc<dyn JwtValidator> = match &settings.jwt_key {
        JwtKey::Secret(secret) => Arc::new(Hs256JwtValidator::new(secret.clone())),
        JwtKey::RsaPem(pem) => Arc::new(Rs256JwtValidator::from_pem(pem.as_bytes())?),
    };
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());

    let http = HttpRevalidationClient::with_clock(
        settings.billing_api_url.clone(),
        settings.refresh_timeout,
        clock.clone(),
    )?;
    let client = Bounded::new(http, settings.refresh_timeout);

    tracing::info!(
        billing_api_url = %settings.billing_api_url,
        ttl_secs = settings.policy.ttl().num_seconds(),
        degraded_mode = ?settings.policy.degraded_mode(),
        "route gate configured"
    );

    Ok(router_with_gate(gate_state(settings, validator, client, clock)))
}

/// Assemble gate state from already-built collaborators.
pub fn gate_state<C: RevalidationClient>(
    settings: Settings,
    validator: Arc<dyn JwtValidator>,
    client: C,
    clock: Arc<dyn Clock>,
) -> GateState<C> {
    let redirects = RedirectBuilder::new(settings.app_origin, settings.policy.paths().clone());
    let gate = RouteGate::new(Arc::new(settings.policy), validator, client, clock);
    GateState {
        gate: Arc::new(gate),
        redirects: Arc::new(redirects),
    }
}

/// Every route, including the public ones, runs behind the gate.
pub fn router_with_gate<C>(state: GateState<C>) -> Router
where
    C: RevalidationClient + 'static,
{
    Router::new()
        .route("/api/public/health", get(routes::system::health))
        .merge(routes::router())
        .layer(ServiceBuilder::new().layer(axum::middleware::from_fn_with_state(
            state,
            middleware::route_gate_middleware::<C>,
        )))
}
