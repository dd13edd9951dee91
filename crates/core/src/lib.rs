//! `tollgate-core`: small, dependency-light building blocks.
//!
//! This crate contains no HTTP, token or billing concerns.

pub mod clock;
pub mod value_object;

pub use clock::{Clock, FixedClock, SystemClock};
pub use value_object::ValueObject;
