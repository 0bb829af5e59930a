//! Registry of monitored items.

use std::collections::BTreeMap;
use std::sync::Arc;

use milestone_core::ItemId;
use milestone_notify::Payload;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::monitor::{ItemMonitor, MonitorDeps};
use crate::{MonitorError, Result};

struct Entry {
    monitor: Arc<ItemMonitor>,
    handle: Option<JoinHandle<()>>,
}

impl Entry {
    fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

/// Owns every [`ItemMonitor`] and its polling task.
pub struct MonitorManager {
    deps: MonitorDeps,
    config: AppConfig,
    entries: BTreeMap<ItemId, Entry>,
}

impl MonitorManager {
    /// Empty registry.
    pub fn new(deps: MonitorDeps, config: AppConfig) -> Self {
        Self { deps, config, entries: BTreeMap::new() }
    }

    /// Current configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<ItemId> {
        self.entries.keys().cloned().collect()
    }

    /// Monitor for `id`.
    pub fn get(&self, id: &ItemId) -> Option<Arc<ItemMonitor>> {
        self.entries.get(id).map(|e| e.monitor.clone())
    }

    fn entry_mut(&mut self, id: &ItemId) -> Result<&mut Entry> {
        self.entries
            .get_mut(id)
            .ok_or_else(|| MonitorError::UnknownItem(id.to_string()))
    }

    /// Register an item; its history and flags are loaded from storage.
    pub async fn add(&mut self, raw: &str) -> Result<ItemId> {
        let id = ItemId::new(raw)?;
        if self.entries.contains_key(&id) {
            return Err(MonitorError::AlreadyTracked(id));
        }
        let interval = self.config.interval_for(&id);
        let monitor = ItemMonitor::open(id.clone(), self.deps.clone(), interval).await?;
        self.entries.insert(id.clone(), Entry { monitor: Arc::new(monitor), handle: None });
        info!(item = %id, interval, "added");
        Ok(id)
    }

    /// Stop and unregister an item.
    pub fn remove(&mut self, id: &ItemId) -> Result<()> {
        self.stop(id)?;
        self.entries.remove(id);
        info!(item = %id, "removed");
        Ok(())
    }

    /// Spawn the polling task for `id`.
    pub fn start(&mut self, id: &ItemId) -> Result<()> {
        let entry = self.entry_mut(id)?;
        if entry.is_active() {
            return Err(MonitorError::AlreadyRunning(id.clone()));
        }
        let monitor = entry.monitor.clone();
        entry.handle = Some(tokio::spawn(async move {
            if let Err(e) = monitor.run().await {
                warn!(item = %monitor.id(), error = %e, "monitor did not start");
            }
        }));
        Ok(())
    }

    /// Request `id` to stop; it exits after its current iteration.
    pub fn stop(&mut self, id: &ItemId) -> Result<()> {
        let entry = self.entry_mut(id)?;
        if entry.is_active() {
            entry.monitor.stop();
            info!(item = %id, "stop requested");
        }
        Ok(())
    }

    /// Start every idle monitor. Returns how many were started.
    pub fn start_all(&mut self) -> usize {
        let idle: Vec<ItemId> = self
            .entries
            .iter()
            .filter(|(_, e)| !e.is_active())
            .map(|(id, _)| id.clone())
            .collect();
        idle.iter().filter(|id| self.start(id).is_ok()).count()
    }

    /// Stop every active monitor. Returns how many were asked to stop.
    pub fn stop_all(&mut self) -> usize {
        let mut stopped = 0;
        for (id, entry) in self.entries.iter() {
            if entry.is_active() {
                entry.monitor.stop();
                info!(item = %id, "stop requested");
                stopped += 1;
            }
        }
        stopped
    }

    /// Wait for every polling task to exit. Cancel safe: tasks not yet
    /// joined stay registered.
    pub async fn join_all(&mut self) {
        for entry in self.entries.values_mut() {
            if let Some(handle) = entry.handle.as_mut() {
                let result = handle.await;
                entry.handle = None;
                if let Err(e) = result {
                    warn!(item = %entry.monitor.id(), error = %e, "monitor task failed");
                }
            }
        }
    }

    /// Change the global interval and apply it to every item without an
    /// override.
    pub fn apply_global_interval(&mut self, secs: i64) -> Result<u64> {
        let interval = self.config.set_default_interval(secs)?;
        for (id, entry) in &self.entries {
            if self.config.override_for(id).is_none() {
                entry.monitor.set_interval(interval);
            }
        }
        Ok(interval)
    }

    /// Set or clear the override for one item.
    pub fn set_item_interval(&mut self, id: &ItemId, secs: Option<i64>) -> Result<u64> {
        let monitor = self.entry_mut(id)?.monitor.clone();
        let interval = self.config.set_override(id, secs)?;
        monitor.set_interval(interval);
        Ok(interval)
    }

    /// Push the card of one item.
    pub async fn push(&self, id: &ItemId) -> Result<bool> {
        let monitor = self
            .get(id)
            .ok_or_else(|| MonitorError::UnknownItem(id.to_string()))?;
        monitor.push_card().await
    }

    /// Push one forwarded message with a node per item that has samples.
    pub async fn push_all(&self) -> Result<bool> {
        let mut nodes = Vec::new();
        for entry in self.entries.values() {
            if let Some(node) = entry.monitor.card_node().await {
                nodes.push(node);
            }
        }
        if nodes.is_empty() {
            warn!("nothing to push, no item has samples");
            return Ok(false);
        }
        info!(count = nodes.len(), "pushing all items");
        Ok(self.deps.broadcaster.broadcast(&Payload::Forward(nodes)))
    }
}
