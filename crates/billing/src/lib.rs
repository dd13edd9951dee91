//! `tollgate-billing`: the billing-of-record boundary.
//!
//! The gate asks the billing backend for the current subscription when a
//! principal's cached claims are stale. This crate owns that call and nothing
//! else: no retries, no caching, no policy.

pub mod client;
pub mod dto;
pub mod error;
pub mod http;

pub use client::{Bounded, RevalidationClient};
pub use dto::CurrentSubscription;
pub use error::RefreshError;
pub use http::HttpRevalidationClient;
