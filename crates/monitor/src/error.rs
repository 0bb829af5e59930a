//! Error types for sampling and monitoring.

use std::time::Duration;

use milestone_core::{InvalidItemId, ItemId};
use milestone_storage::StorageError;

/// Result type for monitor operations.
pub type Result<T> = std::result::Result<T, MonitorError>;

/// A stats or metadata fetch failed. Always transient from the loop's view.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Transport-level failure
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    /// The call did not finish in time
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The API answered with a non-zero code
    #[error("API error {code}: {message}")]
    Api {
        /// API status code
        code: i64,
        /// API message
        message: String,
    },

    /// Body could not be understood
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout(Duration::ZERO)
        } else if e.is_decode() {
            FetchError::Decode(e.to_string())
        } else {
            FetchError::Http(e)
        }
    }
}

/// Errors surfaced by monitors and the registry.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// Sampling failed
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// A durable write or read failed
    #[error("persistence failed: {0}")]
    Persistence(#[from] StorageError),

    /// The polling loop is already active
    #[error("{0} is already running")]
    AlreadyRunning(ItemId),

    /// The item is already registered
    #[error("{0} is already tracked")]
    AlreadyTracked(ItemId),

    /// No monitor is registered under this id
    #[error("unknown item: {0}")]
    UnknownItem(String),

    /// Malformed item id
    #[error(transparent)]
    InvalidId(#[from] InvalidItemId),

    /// Interval must be a positive number of seconds
    #[error("invalid interval: {0}")]
    InvalidInterval(i64),

    /// Nothing has been sampled yet
    #[error("{0} has no samples yet")]
    NoSamples(ItemId),

    /// Configuration file could not be written
    #[error("config error: {0}")]
    Config(String),
}
