//! Milestone monitoring.
//!
//! Ties sampling, persistence, forecasting and notification together:
//! - [`Sampler`] fetches counters for an item
//! - [`SampleStore`] keeps the history in step with storage
//! - [`policy`] decides on sprint mode and milestones
//! - [`ItemMonitor`] runs the per-item polling loop
//! - [`MonitorManager`] owns all monitors

#![warn(missing_docs)]

pub mod error;
pub mod sampler;
pub mod store;
pub mod policy;
pub mod report;
pub mod config;
pub mod monitor;
pub mod manager;

pub use error::{FetchError, MonitorError, Result};
pub use sampler::{BilibiliSampler, Sampler, VIEW_API};
pub use store::SampleStore;
pub use policy::{evaluate, PolicyAction, PolicyConfig};
pub use report::{milestone_text, sprint_text, ItemReport, StatusReport};
pub use config::{AppConfig, DEFAULT_CONFIG_FILE, DEFAULT_INTERVAL};
pub use monitor::{ItemMonitor, MonitorDeps, TickOutcome};
pub use manager::MonitorManager;
