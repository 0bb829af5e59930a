//! Tracking state - per-item lifecycle flags and milestone targets.

use serde::{Deserialize, Serialize};

/// First milestone ceiling.
pub const FIRST_TARGET: u64 = 1_000_000;

/// Ceiling used once extended tracking is active.
pub const FINAL_TARGET: u64 = 10_000_000;

/// Remaining views at or below which sprint mode kicks in.
pub const SPRINT_WINDOW: u64 = 500;

/// Sampling interval (seconds) used while sprinting.
pub const SPRINT_INTERVAL_SECS: u64 = 10;

/// Lifecycle phase of a tracked item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonitorPhase {
    /// Registered but not polling
    Idle,
    /// Polling at the configured interval
    Running,
    /// Polling at the sprint interval close to a target
    Sprinting,
    /// First ceiling was already passed on the first fetch; tracking continues
    ReachedIntermediate,
    /// Final ceiling reached for this run
    ReachedFinal,
    /// Loop exited
    Stopped,
}

impl std::fmt::Display for MonitorPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MonitorPhase::Idle => "idle",
            MonitorPhase::Running => "running",
            MonitorPhase::Sprinting => "sprinting",
            MonitorPhase::ReachedIntermediate => "reached-intermediate",
            MonitorPhase::ReachedFinal => "reached-final",
            MonitorPhase::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Mutable per-item state owned by one monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingState {
    /// Whether the polling loop is active
    pub is_monitoring: bool,

    /// Set after the first tick of a fresh history (or when resuming)
    pub first_fetch_done: bool,

    /// Ceiling raised from [`FIRST_TARGET`] to [`FINAL_TARGET`]
    pub extended_target_mode: bool,

    /// Near-target alert already sent for [`Self::special_push_target`]
    pub special_push_done: bool,

    /// Target the near-target alert was sent for
    pub special_push_target: Option<u64>,

    /// Sampling interval currently in effect (seconds)
    pub effective_interval: u64,

    /// Current lifecycle phase
    pub phase: MonitorPhase,
}

impl TrackingState {
    /// Fresh state for a newly added item.
    pub fn new(interval: u64) -> Self {
        Self {
            is_monitoring: false,
            first_fetch_done: false,
            extended_target_mode: false,
            special_push_done: false,
            special_push_target: None,
            effective_interval: interval.max(1),
            phase: MonitorPhase::Idle,
        }
    }

    /// Current target ceiling.
    pub fn target(&self) -> u64 {
        if self.extended_target_mode {
            FINAL_TARGET
        } else {
            FIRST_TARGET
        }
    }

    /// Whether the near-target alert has already fired for `target`.
    pub fn sprint_alert_sent_for(&self, target: u64) -> bool {
        self.special_push_done
            && self.special_push_target.map_or(true, |t| t == target)
    }

    /// Restore flags from a stored history tail and the persisted blob.
    pub fn resume(&mut self, last_view: Option<u64>, persisted: &PersistedState) {
        if let Some(view) = last_view {
            self.first_fetch_done = true;
            if view >= FIRST_TARGET {
                self.extended_target_mode = true;
            }
        }
        self.special_push_done = persisted.special_push_done;
        self.special_push_target = persisted.special_push_target;
    }

    /// Blob that must survive a restart.
    pub fn persisted(&self) -> PersistedState {
        PersistedState {
            special_push_done: self.special_push_done,
            special_push_target: self.special_push_target,
        }
    }
}

/// Small per-item state blob kept next to the history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    /// Near-target alert already announced
    #[serde(default)]
    pub special_push_done: bool,

    /// Target the alert was announced for; `None` in older blobs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_push_target: Option<u64>,
}
