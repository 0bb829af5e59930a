//! Human-readable texts built from samples.

use std::fmt;

use milestone_core::{ItemId, MonitorPhase, Sample};

/// Text of a milestone notification.
pub fn milestone_text(id: &ItemId, view: u64, target: u64) -> String {
    format!("{} reached milestone: {} / {}", id, view, target)
}

/// Text of a near-target alert.
pub fn sprint_text(id: &ItemId, view: u64, target: u64) -> String {
    format!(
        "{} is {} views away from {} (now {})",
        id,
        target.saturating_sub(view),
        target,
        view
    )
}

/// Everything shown on a pushed card.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemReport {
    /// Item the card is about
    pub id: ItemId,
    /// Video title, the id when unknown
    pub title: String,
    /// Latest stored sample
    pub latest: Sample,
    /// Fresh duration label
    pub estimated_time: String,
    /// Fresh completion label
    pub estimated_date: String,
    /// Points the fresh estimate is based on
    pub valid_sample_count: usize,
    /// Mean increment per sampling interval
    pub average_increment: f64,
}

impl ItemReport {
    /// Card body; kept in one text block so line breaks survive forwarding.
    pub fn card_text(&self) -> String {
        let s = &self.latest;
        [
            format!("Title: {}", self.title),
            format!("Id: {}", self.id),
            format!("Views: {}", s.view),
            format!("Likes: {}", s.like),
            format!("Coins: {}", s.coin),
            format!("Comments: {}", s.reply),
            format!("Favorites: {}", s.favorite),
            format!("Shares: {}", s.share),
            format!("Danmaku: {}", s.danmaku),
            format!("View increment: {}", s.view_increment),
            format!("Average increment (per interval): {:.2}", self.average_increment),
            format!("Estimated time to target: {}", self.estimated_time),
            format!("Estimated date: {}", self.estimated_date),
            format!("Sampled at: {}", s.time),
            format!("(based on {} valid samples)", self.valid_sample_count),
        ]
        .join("\n")
    }
}

/// Snapshot of one monitor for status output.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    /// Item id
    pub id: ItemId,
    /// Lifecycle phase
    pub phase: MonitorPhase,
    /// Interval in effect (seconds)
    pub effective_interval: u64,
    /// Current ceiling
    pub target: u64,
    /// Samples stored
    pub sample_count: usize,
    /// Latest sample
    pub latest: Option<Sample>,
    /// View increments of the last samples, oldest first
    pub recent_increments: Vec<i64>,
}

/// View increments of the last `window` samples.
pub fn recent_increments(samples: &[Sample], window: usize) -> Vec<i64> {
    let start = samples.len().saturating_sub(window);
    samples[start..].iter().map(|s| s.view_increment).collect()
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} [{}]", self.id, self.phase)?;
        writeln!(f, "  Target: {}", self.target)?;
        writeln!(f, "  Interval: {}s", self.effective_interval)?;
        writeln!(f, "  Samples: {}", self.sample_count)?;
        match &self.latest {
            Some(s) => {
                writeln!(f, "  Latest: {} views at {}", s.view, s.time)?;
                writeln!(f, "  Estimate: {} ({})", s.estimated_time, s.estimated_date)?;
            }
            None => writeln!(f, "  Latest: -")?,
        }
        let incs: Vec<String> = self.recent_increments.iter().map(|i| i.to_string()).collect();
        write!(f, "  Recent increments: [{}]", incs.join(", "))
    }
}
