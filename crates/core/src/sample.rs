//! Sample model - one observation of a video's public counters.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Wire format of sample timestamps (local time, second resolution).
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a timestamp in [`TIME_FORMAT`].
pub fn format_time(t: NaiveDateTime) -> String {
    t.format(TIME_FORMAT).to_string()
}

/// Parse a timestamp in [`TIME_FORMAT`].
pub fn parse_time(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s.trim(), TIME_FORMAT).ok()
}

/// Current local time truncated to whole seconds.
pub fn now_local() -> NaiveDateTime {
    let now = chrono::Local::now().naive_local();
    parse_time(&format_time(now)).unwrap_or(now)
}

/// Raw counters returned by one stats fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatSnapshot {
    /// Cumulative view count
    pub view: u64,
    /// Likes
    pub like: u64,
    /// Coins
    pub coin: u64,
    /// Comments
    pub reply: u64,
    /// Shares
    pub share: u64,
    /// Danmaku (bullet comments)
    pub danmaku: u64,
    /// Favorites
    pub favorite: u64,
}

/// Metadata fetched once when a session starts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Video title
    pub title: String,
    /// Cover image URL, if the API returned one
    pub cover_url: Option<String>,
}

/// One persisted observation plus the advisory forecast computed at sample time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Sampling time, see [`TIME_FORMAT`]
    pub time: String,

    /// Cumulative view count
    pub view: u64,

    /// Likes
    #[serde(default)]
    pub like: u64,

    /// Coins
    #[serde(default)]
    pub coin: u64,

    /// Comments
    #[serde(default)]
    pub reply: u64,

    /// Shares
    #[serde(default)]
    pub share: u64,

    /// Danmaku
    #[serde(default)]
    pub danmaku: u64,

    /// Favorites
    #[serde(default)]
    pub favorite: u64,

    /// `view - previous.view`, 0 for the first sample of a history
    #[serde(default)]
    pub view_increment: i64,

    /// Mean non-negative increment per sampling interval
    #[serde(default)]
    pub avg_increment_per_interval: f64,

    /// Human readable time-to-target
    #[serde(default)]
    pub estimated_time: String,

    /// Absolute completion time, or the same advisory label when unavailable
    #[serde(default)]
    pub estimated_date: String,

    /// Number of samples the forecast was based on
    #[serde(default)]
    pub sample_count: usize,
}

impl Sample {
    /// Build a sample from a stats snapshot with empty forecast fields.
    pub fn from_stats(time: NaiveDateTime, stats: &StatSnapshot, view_increment: i64) -> Self {
        Self {
            time: format_time(time),
            view: stats.view,
            like: stats.like,
            coin: stats.coin,
            reply: stats.reply,
            share: stats.share,
            danmaku: stats.danmaku,
            favorite: stats.favorite,
            view_increment,
            avg_increment_per_interval: 0.0,
            estimated_time: String::new(),
            estimated_date: String::new(),
            sample_count: 0,
        }
    }

    /// Parsed sampling time, `None` if the stored string is malformed.
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        parse_time(&self.time)
    }
}
