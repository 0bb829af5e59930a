//! In-memory sample history mirrored to durable storage.

use std::sync::Arc;

use milestone_core::{ItemId, Sample};
use milestone_storage::{Result, Storage};
use tokio::sync::Mutex;
use tracing::{error, info};

/// Ordered, append-only history of one item.
///
/// The lock is held across the durable write so readers never observe a
/// sample that has not been persisted.
pub struct SampleStore {
    id: ItemId,
    storage: Arc<dyn Storage>,
    samples: Mutex<Vec<Sample>>,
}

impl SampleStore {
    /// Load the stored history for `id`.
    pub async fn load(id: ItemId, storage: Arc<dyn Storage>) -> Result<Self> {
        let samples = storage.load_history(&id).await?;
        if !samples.is_empty() {
            info!(item = %id, count = samples.len(), "loaded history");
        }
        Ok(Self { id, storage, samples: Mutex::new(samples) })
    }

    /// Append `sample` and persist the whole history.
    ///
    /// On a failed write the sample is removed again and the error returned.
    pub async fn append(&self, sample: Sample) -> Result<usize> {
        let mut samples = self.samples.lock().await;
        samples.push(sample);
        if let Err(e) = self.storage.save_history(&self.id, &samples).await {
            samples.pop();
            error!(item = %self.id, error = %e, "write failed, sample rolled back");
            return Err(e);
        }
        Ok(samples.len())
    }

    /// Consistent copy of the history.
    pub async fn snapshot(&self) -> Vec<Sample> {
        self.samples.lock().await.clone()
    }

    /// Most recent sample.
    pub async fn last(&self) -> Option<Sample> {
        self.samples.lock().await.last().cloned()
    }

    /// Number of samples.
    pub async fn len(&self) -> usize {
        self.samples.lock().await.len()
    }

    /// Whether nothing was sampled yet.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
