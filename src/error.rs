//! Error types for the catalog data layer

use thiserror::Error;

/// Result type alias for catalog operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the catalog data layer.
///
/// Cloneable so one fetch outcome can be handed to every coalesced waiter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Transport failure, non-success status or timeout
    #[error("Network error: {0}")]
    Network(String),

    /// Response was not a well-formed collection or record
    #[error("Format error: {0}")]
    Format(String),

    /// Single-item lookup miss
    #[error("Not found: {0}")]
    NotFound(String),

    /// Snapshot store errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Format(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Error::Format(e.to_string())
        } else {
            Error::Network(e.to_string())
        }
    }
}

impl From<tokio::time::error::Elapsed> for Error {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Error::Network("request timed out".to_string())
    }
}
