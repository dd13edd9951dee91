//! Process settings, read once at startup.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;
use thiserror::Error;

use tollgate_entitlement::{ConfigError, PolicyConfig, PolicyDocument};

pub const DEFAULT_BILLING_API_URL: &str = "http://localhost:8000/api/v1";
pub const DEFAULT_APP_ORIGIN: &str = "http://localhost:3000";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_REFRESH_TIMEOUT_MS: u64 = 2_000;
const DEV_JWT_SECRET: &str = "dev-secret";

/// How session tokens are verified.
#[derive(Clone)]
pub enum JwtKey {
    Secret(Vec<u8>),
    RsaPem(String),
}

impl core::fmt::Debug for JwtKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Secret(_) => f.write_str("JwtKey::Secret(..)"),
            Self::RsaPem(_) => f.write_str("JwtKey::RsaPem(..)"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid policy: {0}")]
    Policy(#[from] ConfigError),

    #[error("failed to read policy file {path}: {source}")]
    PolicyFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse policy file {path}: {source}")]
    PolicyJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {name}: {value:?}")]
    InvalidVar { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub policy: PolicyConfig,
    pub billing_api_url: String,
    pub refresh_timeout: Duration,
    pub app_origin: Url,
    pub jwt_key: JwtKey,
    pub bind_addr: SocketAddr,
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build settings from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut doc = match lookup("TOLLGATE_POLICY") {
            Some(path) => read_policy(PathBuf::from(path))?,
            None => PolicyDocument::default(),
        };
        if let Some(ttl) = lookup("SUBSCRIPTION_TTL_SECS") {
            doc.ttl_secs = parse_var("SUBSCRIPTION_TTL_SECS", ttl)?;
        }
        let policy = PolicyConfig::from_document(doc)?;

        let refresh_timeout = match lookup("REFRESH_TIMEOUT_MS") {
            Some(ms) => Duration::from_millis(parse_var("REFRESH_TIMEOUT_MS", ms)?),
            None => Duration::from_millis(DEFAULT_REFRESH_TIMEOUT_MS),
        };

        let origin = lookup("APP_ORIGIN").unwrap_or_else(|| DEFAULT_APP_ORIGIN.to_string());
        let app_origin = Url::parse(&origin).map_err(|_| SettingsError::InvalidVar {
            name: "APP_ORIGIN",
            value: origin.clone(),
        })?;

        let bind = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = parse_var("BIND_ADDR", bind)?;

        let jwt_key = match (lookup("JWT_PUBLIC_KEY_PEM"), lookup("JWT_SECRET")) {
            (Some(pem), _) => JwtKey::RsaPem(pem),
            (None, Some(secret)) => JwtKey::Secret(secret.into_bytes()),
            (None, None) => {
                tracing::warn!("neither JWT_PUBLIC_KEY_PEM nor JWT_SECRET set; using insecure dev default");
                JwtKey::Secret(DEV_JWT_SECRET.as_bytes().to_vec())
            }
        };

        Ok(Self {
            policy,
            billing_api_url: lookup("BILLING_API_URL").unwrap_or_else(|| DEFAULT_BILLING_API_URL.to_string()),
            refresh_timeout,
            app_origin,
            jwt_key,
            bind_addr,
        })
    }
}

fn read_policy(path: PathBuf) -> Result<PolicyDocument, SettingsError> {
    let raw = std::fs::read_to_string(&path).map_err(|source| SettingsError::PolicyFile {
        path: path.clone(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| SettingsError::PolicyJson { path, source })
}

fn parse_var<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, SettingsError> {
    value
        .trim()
        .parse()
        .map_err(|_| SettingsError::InvalidVar { name, value })
}
