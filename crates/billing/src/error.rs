use thiserror::Error;

/// Why a refresh could not produce a snapshot.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RefreshError {
    /// The backend rejected the principal's token.
    #[error("billing backend rejected the token")]
    Unauthorized,

    /// Network failure, timeout, or a 5xx from the backend.
    #[error("billing backend unreachable: {0}")]
    Unreachable(String),

    /// The backend answered, but not with anything usable.
    #[error("malformed billing response: {0}")]
    Malformed(String),
}

impl RefreshError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::Unreachable(_) => "unreachable",
            Self::Malformed(_) => "malformed",
        }
    }
}
