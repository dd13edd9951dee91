//! Process-wide tracing setup for the gate binary.

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use tracing::LogFormat;

/// Initialize tracing with the format picked from `LOG_FORMAT`.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init(LogFormat::from_env());
}
