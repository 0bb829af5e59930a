//! JSON file storage implementation.
//!
//! Each item gets its own directory holding the primary history file (a
//! pretty-printed JSON array), a JSON-lines ledger with the same samples,
//! the state blob and the saved cover image.

use std::path::{Path, PathBuf};
use milestone_core::{ItemId, PersistedState, Sample};
use super::{Storage, StorageError, Result};
use crate::consistency::{compare, ConsistencyReport, ConsistencyStatus, Encoding};
use tokio::fs;
use tracing::{debug, warn};

/// File-based JSON storage backend.
pub struct JsonStorage {
    root: PathBuf,
}

impl JsonStorage {
    /// Create storage rooted at `root`, creating the directory if needed.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn item_dir(&self, id: &ItemId) -> PathBuf {
        self.root.join(id.as_str())
    }
    fn history_path(&self, id: &ItemId) -> PathBuf {
        self.item_dir(id).join(format!("{}.json", id))
    }
    fn ledger_path(&self, id: &ItemId) -> PathBuf {
        self.item_dir(id).join(format!("{}.jsonl", id))
    }
    fn state_path(&self, id: &ItemId) -> PathBuf {
        self.item_dir(id).join("state.json")
    }
    fn cover_path(&self, id: &ItemId) -> PathBuf {
        self.item_dir(id).join("cover.jpg")
    }

    async fn ensure_item_dir(&self, id: &ItemId) -> Result<()> {
        fs::create_dir_all(self.item_dir(id)).await?;
        Ok(())
    }

    async fn read_primary(&self, id: &ItemId) -> Encoding {
        match read_json::<Vec<Sample>>(&self.history_path(id)).await {
            Ok(Some(samples)) => Encoding::Loaded(samples),
            Ok(None) => Encoding::Missing,
            Err(e) => Encoding::Unreadable(format!("primary: {}", e)),
        }
    }

    async fn read_ledger(&self, id: &ItemId) -> Encoding {
        match fs::read_to_string(self.ledger_path(id)).await {
            Ok(text) => {
                let parsed: std::result::Result<Vec<Sample>, _> = text
                    .lines()
                    .filter(|l| !l.trim().is_empty())
                    .map(serde_json::from_str)
                    .collect();
                match parsed {
                    Ok(samples) => Encoding::Loaded(samples),
                    Err(e) => Encoding::Unreadable(format!("ledger: {}", e)),
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Encoding::Missing,
            Err(e) => Encoding::Unreadable(format!("ledger: {}", e)),
        }
    }

    async fn write_ledger(&self, id: &ItemId, samples: &[Sample]) -> Result<()> {
        let mut out = String::new();
        for sample in samples {
            out.push_str(&serde_json::to_string(sample)?);
            out.push('\n');
        }
        write_atomic(&self.ledger_path(id), out.as_bytes()).await
    }
}

#[async_trait::async_trait]
impl Storage for JsonStorage {
    async fn load_history(&self, id: &ItemId) -> Result<Vec<Sample>> {
        let report = self.check_consistency(id).await?;
        // Nothing recovered from an existing file: refuse rather than let the
        // next save overwrite it.
        if let ConsistencyStatus::Unreadable(e) = &report.status {
            if report.samples.is_empty() {
                return Err(StorageError::Other(format!("history of {} is unreadable: {}", id, e)));
            }
        }
        if !report.is_consistent() {
            warn!(item = %id, status = %report.status, "stored history encodings disagree");
        }
        Ok(report.samples)
    }

    async fn save_history(&self, id: &ItemId, samples: &[Sample]) -> Result<()> {
        self.ensure_item_dir(id).await?;

        let json = serde_json::to_string_pretty(samples)?;
        write_atomic(&self.history_path(id), json.as_bytes()).await?;

        // Primary is authoritative; a stale ledger shows up in the next check.
        if let Err(e) = self.write_ledger(id, samples).await {
            warn!(item = %id, error = %e, "history saved but ledger write failed");
        }
        debug!(item = %id, samples = samples.len(), "history saved");
        Ok(())
    }

    async fn check_consistency(&self, id: &ItemId) -> Result<ConsistencyReport> {
        let primary = self.read_primary(id).await;
        let ledger = self.read_ledger(id).await;
        Ok(compare(primary, ledger))
    }

    async fn load_state(&self, id: &ItemId) -> Result<PersistedState> {
        Ok(read_json(&self.state_path(id)).await?.unwrap_or_default())
    }

    async fn save_state(&self, id: &ItemId, state: &PersistedState) -> Result<()> {
        self.ensure_item_dir(id).await?;
        let json = serde_json::to_string_pretty(state)?;
        write_atomic(&self.state_path(id), json.as_bytes()).await
    }

    async fn save_cover(&self, id: &ItemId, bytes: &[u8]) -> Result<PathBuf> {
        self.ensure_item_dir(id).await?;
        let path = self.cover_path(id);
        write_atomic(&path, bytes).await?;
        Ok(path)
    }

    async fn load_cover(&self, id: &ItemId) -> Result<Option<Vec<u8>>> {
        match fs::read(self.cover_path(id)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(json) => {
            let value = serde_json::from_str(&json)?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConsistencyStatus;
    use milestone_core::{parse_time, StatSnapshot};
    use tempfile::TempDir;

    fn id() -> ItemId {
        ItemId::new("BV1xx411c7mD").unwrap()
    }

    fn samples(n: u64) -> Vec<Sample> {
        let start = parse_time("2024-05-01 12:00:00").unwrap();
        (0..n)
            .map(|i| {
                let stats = StatSnapshot { view: 1000 + i * 50, ..Default::default() };
                let t = start + chrono::Duration::seconds(75 * i as i64);
                Sample::from_stats(t, &stats, if i == 0 { 0 } else { 50 })
            })
            .collect()
    }

    #[tokio::test]
    async fn test_empty_store_loads_nothing() {
        let dir = TempDir::new().unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();
        assert!(storage.load_history(&id()).await.unwrap().is_empty());
        assert_eq!(storage.load_state(&id()).await.unwrap(), PersistedState::default());
        assert!(storage.load_cover(&id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_history_round_trip_keeps_order() {
        let dir = TempDir::new().unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();
        let history = samples(4);
        storage.save_history(&id(), &history).await.unwrap();

        let loaded = storage.load_history(&id()).await.unwrap();
        assert_eq!(loaded, history);

        let report = storage.check_consistency(&id()).await.unwrap();
        assert_eq!(report.status, ConsistencyStatus::Consistent);
    }

    #[tokio::test]
    async fn test_files_are_laid_out_per_item() {
        let dir = TempDir::new().unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();
        storage.save_history(&id(), &samples(2)).await.unwrap();
        let item_dir = dir.path().join("BV1xx411c7mD");
        assert!(item_dir.join("BV1xx411c7mD.json").exists());
        assert!(item_dir.join("BV1xx411c7mD.jsonl").exists());
        let ledger = std::fs::read_to_string(item_dir.join("BV1xx411c7mD.jsonl")).unwrap();
        assert_eq!(ledger.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_tampered_ledger_is_detected() {
        let dir = TempDir::new().unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();
        storage.save_history(&id(), &samples(3)).await.unwrap();

        let mut tampered = samples(3);
        tampered[1].view += 1;
        storage.write_ledger(&id(), &tampered).await.unwrap();

        let report = storage.check_consistency(&id()).await.unwrap();
        assert_eq!(report.status, ConsistencyStatus::Mismatch { index: 1 });
        // Primary still wins on load.
        let loaded = storage.load_history(&id()).await.unwrap();
        assert_eq!(loaded[1].view, 1050);
    }

    #[tokio::test]
    async fn test_unreadable_primary_without_ledger_is_an_error() {
        let dir = TempDir::new().unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();
        storage.save_history(&id(), &samples(50)).await.unwrap();

        let primary = storage.history_path(&id());
        let json = std::fs::read_to_string(&primary).unwrap();
        std::fs::write(&primary, &json[..json.len() / 2]).unwrap();
        std::fs::remove_file(storage.ledger_path(&id())).unwrap();

        let err = storage.load_history(&id()).await.unwrap_err();
        assert!(matches!(err, StorageError::Other(_)));
        // The damaged file is left for inspection.
        assert_eq!(std::fs::read_to_string(&primary).unwrap().len(), json.len() / 2);
    }

    #[tokio::test]
    async fn test_unreadable_primary_recovers_from_ledger() {
        let dir = TempDir::new().unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();
        storage.save_history(&id(), &samples(5)).await.unwrap();
        std::fs::write(storage.history_path(&id()), "[{").unwrap();

        assert_eq!(storage.load_history(&id()).await.unwrap(), samples(5));
    }

    #[tokio::test]
    async fn test_state_blob_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let blob = PersistedState { special_push_done: true, special_push_target: Some(1_000_000) };
        {
            let storage = JsonStorage::new(dir.path()).await.unwrap();
            storage.save_state(&id(), &blob).await.unwrap();
        }
        let storage = JsonStorage::new(dir.path()).await.unwrap();
        assert_eq!(storage.load_state(&id()).await.unwrap(), blob);
    }

    #[tokio::test]
    async fn test_cover_round_trip() {
        let dir = TempDir::new().unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();
        let path = storage.save_cover(&id(), b"\xff\xd8jpeg").await.unwrap();
        assert!(path.ends_with("cover.jpg"));
        assert_eq!(storage.load_cover(&id()).await.unwrap().unwrap(), b"\xff\xd8jpeg".to_vec());
    }
}
