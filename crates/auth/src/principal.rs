use serde::{Deserialize, Serialize};

/// Identity of an authenticated principal, as issued by the identity provider.
///
/// Provider identifiers are opaque strings (e.g. `user_2aXk...`), so no
/// particular format is assumed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(String);

impl PrincipalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for PrincipalId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for PrincipalId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
