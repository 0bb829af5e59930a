//! Storage trait abstraction.

use async_trait::async_trait;
use milestone_core::{ItemId, PersistedState, Sample};
use std::path::PathBuf;

use crate::ConsistencyReport;

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Durable storage for per-item sample histories and state blobs.
///
/// Implementations are shared between a polling task and readers, so every
/// operation takes `&self`.
#[async_trait]
pub trait Storage: Send + Sync {
    // === History ===

    /// Load the ordered history, empty if none was stored.
    ///
    /// Fails when a stored history exists but no sample can be recovered.
    async fn load_history(&self, id: &ItemId) -> Result<Vec<Sample>>;

    /// Replace the stored history with `samples`.
    ///
    /// Returns an error only if the authoritative encoding was not written.
    async fn save_history(&self, id: &ItemId, samples: &[Sample]) -> Result<()>;

    /// Compare the two stored encodings of a history.
    async fn check_consistency(&self, id: &ItemId) -> Result<ConsistencyReport>;

    // === State blob ===

    /// Load the state blob, default if none was stored.
    async fn load_state(&self, id: &ItemId) -> Result<PersistedState>;

    /// Persist the state blob.
    async fn save_state(&self, id: &ItemId, state: &PersistedState) -> Result<()>;

    // === Cover ===

    /// Persist the cover image and return where it was written.
    async fn save_cover(&self, id: &ItemId, bytes: &[u8]) -> Result<PathBuf>;

    /// Load the cover image if one was saved.
    async fn load_cover(&self, id: &ItemId) -> Result<Option<Vec<u8>>>;
}
