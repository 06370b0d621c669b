//! Error types for the Mulesoft agents

use std::time::Duration;
use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the agents
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error("Subscription failed: {0}")]
    Subscription(String),

    #[error("Policy mismatch: {0}")]
    PolicyMismatch(String),

    #[error("Cache miss: {0}")]
    CacheMiss(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Operation failed: {0}")]
    Other(String),
}

/// Errors raised while talking to the Anypoint platform or the catalog
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected response ({status}): {body}")]
    UnexpectedResponse { status: u16, body: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Failed to marshal request: {0}")]
    Marshal(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded. Retry after {0:?}")]
    RateLimit(Duration),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Transport("Request timed out".to_string())
        } else if err.is_connect() {
            ApiError::Transport("Failed to connect to remote".to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

impl ApiError {
    /// True for errors the token refresher should treat as credential problems.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            ApiError::Auth(_) | ApiError::UnexpectedResponse { status: 401, .. }
        )
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing required configuration: {0}")]
    MissingField(&'static str),
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Errors from spec selection and normalization
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("No eligible specification file")]
    NoSpecFile,

    #[error("Unknown specification format")]
    UnknownFormat,

    #[error("Failed to read archive: {0}")]
    Archive(String),

    #[error("Failed to rewrite specification: {0}")]
    Rewrite(String),
}

impl From<zip::result::ZipError> for SpecError {
    fn from(err: zip::result::ZipError) -> Self {
        SpecError::Archive(err.to_string())
    }
}
