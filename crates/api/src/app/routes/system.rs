use axum::{
    Json,
    extract::Extension,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};

use crate::app::errors::missing_context;
use crate::context::EntitlementContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(ctx: Option<Extension<EntitlementContext>>) -> Response {
    let Some(Extension(ctx)) = ctx else {
        return missing_context();
    };
    let snapshot = ctx.snapshot();

    Json(serde_json::json!({
        "principal_id": ctx.principal_id().map(|p| p.to_string()),
        "decision": ctx.decision(),
        "degraded": ctx.is_degraded(),
        "subscription_status": snapshot.map(|s| s.subscription_status().as_str()),
        "subscription_plan": snapshot.and_then(|s| s.subscription_plan()).map(|p| p.as_str().to_string()),
        "subscription_end": snapshot.and_then(|s| s.subscription_end()).map(|t| t.to_rfc3339()),
        "last_checked": snapshot.and_then(|s| s.last_checked()).map(|t| t.to_rfc3339()),
    }))
    .into_response()
}

/// Stand-in for the resources the gate protects.
pub async fn protected(uri: Uri, ctx: Option<Extension<EntitlementContext>>) -> Response {
    let Some(Extension(ctx)) = ctx else {
        return missing_context();
    };

    Json(serde_json::json!({
        "path": uri.path(),
        "decision": ctx.decision(),
        "degraded": ctx.is_degraded(),
    }))
    .into_response()
}
