use axum::{Router, routing::get};

pub mod system;

/// Routes behind the gate. Anything unmatched falls through to the
/// stand-in protected resource so every configured prefix is reachable.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .fallback(system::protected)
}
