use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Handlers behind the gate expect its context; absence means a wiring bug.
pub fn missing_context() -> axum::response::Response {
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "missing_entitlement_context",
        "request reached a gated handler without passing the route gate",
    )
}
