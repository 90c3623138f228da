//! Top-level error types for the bridge.

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error enum wrapping domain-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingKey(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Chat backend (Matrix client-server API) errors.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("chat backend returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("chat backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected chat backend response: {0}")]
    BadResponse(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
