//! HTTP edge: the subscription gate as axum middleware, plus its wiring.

pub mod app;
pub mod config;
pub mod context;
pub mod gate;
pub mod middleware;
pub mod redirect;
