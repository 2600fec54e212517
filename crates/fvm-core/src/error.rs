//! Error types for fvm-core

use thiserror::Error;

/// Main error type for fvm-core
#[derive(Error, Debug)]
pub enum Error {
    /// Connection failure, timeout or non-success HTTP status
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Token or date-field extraction failed
    #[error("Parse error: {0}")]
    Parse(String),

    /// The portal answered with an unexpected payload shape
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The portal rejected the credentials
    #[error("Authentication failed for user: {0}")]
    Authentication(String),

    #[error("Portal session is closed")]
    SessionClosed,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether the error means the stored credentials must be replaced
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }
}

/// Result type alias for fvm-core
pub type Result<T> = std::result::Result<T, Error>;
