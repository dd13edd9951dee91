//! Tracing subscriber initialization.
//!
//! Filter comes from `RUST_LOG`; gate decisions are logged at `debug` (admit)
//! and `info` (redirect), so `RUST_LOG=info` keeps only the redirects.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Human-readable, for local development.
    Pretty,
}

impl LogFormat {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Self::Pretty,
            _ => Self::Json,
        }
    }

    pub fn from_env() -> Self {
        std::env::var("LOG_FORMAT")
            .map(|raw| Self::parse(&raw))
            .unwrap_or_default()
    }
}

pub fn init(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::SystemTime);

    let _ = match format {
        LogFormat::Json => builder.json().with_target(false).try_init(),
        LogFormat::Pretty => builder.with_target(true).try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_formats_fall_back_to_json() {
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse(" TEXT "), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("yaml"), LogFormat::Json);
    }

    #[test]
    fn init_twice_is_harmless() {
        init(LogFormat::Pretty);
        init(LogFormat::Json);
    }
}
