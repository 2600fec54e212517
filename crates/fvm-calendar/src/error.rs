//! Error types for fvm-calendar

use thiserror::Error;

/// fvm-calendar error type
#[derive(Error, Debug)]
pub enum CalendarError {
    /// The portal rejected the stored credentials; the account must be reconfigured
    #[error("Reauthentication required for: {0}")]
    ReauthRequired(String),

    #[error(transparent)]
    Portal(#[from] fvm_core::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, CalendarError>;
