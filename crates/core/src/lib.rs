//! Milestone core data models.
//!
//! This crate defines the observations, lifecycle flags and persisted blobs
//! shared by the storage, forecasting and monitoring crates.

#![warn(missing_docs)]

// Identities
mod id;

// Observations
mod sample;

// Lifecycle
mod tracking;

// Re-exports
pub use id::{ItemId, InvalidItemId};
pub use sample::{
    Sample, StatSnapshot, VideoMetadata, TIME_FORMAT, format_time, parse_time, now_local,
};
pub use tracking::{
    TrackingState, PersistedState, MonitorPhase,
    FIRST_TARGET, FINAL_TARGET, SPRINT_WINDOW, SPRINT_INTERVAL_SECS,
};
