//! Application configuration file.

use std::collections::BTreeMap;
use std::path::Path;

use milestone_core::ItemId;
use milestone_notify::NotifySettings;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::{MonitorError, Result};

/// Default polling interval in seconds.
pub const DEFAULT_INTERVAL: u64 = 75;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "milestone.json";

/// Settings persisted between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global polling interval (seconds)
    #[serde(default = "default_interval", deserialize_with = "deserialize_interval")]
    pub default_interval: u64,

    /// Per-item interval overrides (seconds)
    #[serde(default)]
    pub intervals: BTreeMap<String, u64>,

    /// Notification settings
    #[serde(flatten)]
    pub notify: NotifySettings,
}

fn default_interval() -> u64 {
    DEFAULT_INTERVAL
}

fn deserialize_interval<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let parsed = match &value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    Ok(parsed.filter(|v| *v > 0).map_or(DEFAULT_INTERVAL, |v| v as u64))
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_interval: DEFAULT_INTERVAL,
            intervals: BTreeMap::new(),
            notify: NotifySettings::default(),
        }
    }
}

impl AppConfig {
    /// Load from `path`. A missing file yields defaults; an unreadable one
    /// yields defaults and a warning.
    pub async fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read config, using defaults");
                return Self::default();
            }
        };
        serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "invalid config, using defaults");
            Self::default()
        })
    }

    /// Write to `path` as pretty JSON.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_vec_pretty(self).map_err(|e| MonitorError::Config(e.to_string()))?;
        tokio::fs::write(path.as_ref(), json)
            .await
            .map_err(|e| MonitorError::Config(e.to_string()))
    }

    /// Override for `id`, if any.
    pub fn override_for(&self, id: &ItemId) -> Option<u64> {
        self.intervals.get(id.as_str()).copied().filter(|v| *v > 0)
    }

    /// Interval that applies to `id`.
    pub fn interval_for(&self, id: &ItemId) -> u64 {
        self.override_for(id).unwrap_or(self.default_interval)
    }

    /// Change the global interval; non-positive values are rejected.
    pub fn set_default_interval(&mut self, secs: i64) -> Result<u64> {
        if secs <= 0 {
            return Err(MonitorError::InvalidInterval(secs));
        }
        self.default_interval = secs as u64;
        Ok(self.default_interval)
    }

    /// Set or clear the override for `id`. Returns the interval now in effect.
    pub fn set_override(&mut self, id: &ItemId, secs: Option<i64>) -> Result<u64> {
        match secs {
            Some(s) if s <= 0 => return Err(MonitorError::InvalidInterval(s)),
            Some(s) => {
                self.intervals.insert(id.to_string(), s as u64);
            }
            None => {
                self.intervals.remove(id.as_str());
            }
        }
        Ok(self.interval_for(id))
    }
}
