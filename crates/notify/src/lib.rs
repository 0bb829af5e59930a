//! Push notifications over the OneBot HTTP API.
//!
//! Messages are either plain text or forwarded cards built from text and
//! image segments. Delivery is queued and retried by a background task.

#![warn(missing_docs)]

pub mod payload;
pub mod settings;
pub mod client;
pub mod broadcast;

pub use payload::{ForwardNode, OutboundAction, Payload, Segment, Target};
pub use settings::{normalize_ids, NotifySettings, NODE_NAME};
pub use client::{Backoff, Notifier, OneBotClient, TransportConfig};
pub use broadcast::Broadcaster;

/// Result type for notification operations.
pub type Result<T> = std::result::Result<T, NotifyError>;

/// Errors raised by the notification layer.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The transport task is no longer running
    #[error("notification queue is closed")]
    QueueClosed,

    /// The HTTP request itself failed (connection refused, timeout, ...)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered but refused the action
    #[error("rejected (status {status}): {message}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Error detail from the endpoint
        message: String,
    },
}
