use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::Instrument;
use uuid::Uuid;

use tollgate_billing::RevalidationClient;

use crate::context::EntitlementContext;
use crate::gate::{GateOutcome, GateRequest, RouteGate};
use crate::redirect::RedirectBuilder;

/// Session cookie set by the identity provider's frontend SDK.
pub const SESSION_COOKIE: &str = "__session";

pub struct GateState<C> {
    pub gate: Arc<RouteGate<C>>,
    pub redirects: Arc<RedirectBuilder>,
}

impl<C> Clone for GateState<C> {
    fn clone(&self) -> Self {
        Self {
            gate: self.gate.clone(),
            redirects: self.redirects.clone(),
        }
    }
}

pub async fn route_gate_middleware<C>(
    State(state): State<GateState<C>>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response
where
    C: RevalidationClient + 'static,
{
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(str::to_string);
    let token = extract_token(req.headers()).map(str::to_string);

    let span = tracing::info_span!("route_gate", request_id = %Uuid::now_v7(), path = %path);
    let outcome = state
        .gate
        .handle(&GateRequest {
            path: &path,
            query: query.as_deref(),
            token: token.as_deref(),
        })
        .instrument(span)
        .await;

    match outcome {
        GateOutcome::Admit(admission) => {
            req.extensions_mut().insert(EntitlementContext::new(admission));
            next.run(req).await
        }
        GateOutcome::Redirect { target, .. } => {
            Redirect::temporary(&state.redirects.location(&target)).into_response()
        }
    }
}

/// Bearer header first, then the session cookie.
fn extract_token(headers: &HeaderMap) -> Option<&str> {
    extract_bearer(headers).or_else(|| extract_session_cookie(headers))
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() { None } else { Some(token) }
}

fn extract_session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(header::COOKIE, HeaderValue::from_static("__session=xyz"));
        assert_eq!(extract_token(&headers), Some("abc"));
    }

    #[test]
    fn session_cookie_is_used_without_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; __session=xyz; __client_uat=1"),
        );
        assert_eq!(extract_token(&headers), Some("xyz"));
    }

    #[test]
    fn malformed_credentials_are_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        headers.insert(header::COOKIE, HeaderValue::from_static("__session="));
        assert_eq!(extract_token(&headers), None);
    }
}
