//! Error types for scope-auth

use std::time::Duration;

use thiserror::Error;

/// Result type alias for scope-auth operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in scope-auth
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    /// The hosted auth service answered with a non-success status
    #[error("Auth provider rejected the request ({status}): {message}")]
    Provider {
        status: u16,
        error_code: Option<String>,
        message: String,
    },

    #[error("Timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}
