//! Notification settings as stored in the application config file.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::payload::Target;

/// Display name used for forwarded nodes.
pub const NODE_NAME: &str = "Monitor";

/// OneBot notification settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifySettings {
    /// Master switch
    #[serde(default)]
    pub onebot_enabled: bool,

    /// Base URL of the OneBot HTTP API
    #[serde(default)]
    pub onebot_http_url: String,

    /// Optional bearer token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onebot_access_token: Option<String>,

    /// Account forwarded nodes are attributed to
    #[serde(default)]
    pub onebot_bot_qq: i64,

    /// Group chats to notify (list or comma-separated string)
    #[serde(default, deserialize_with = "deserialize_ids")]
    pub onebot_group_ids: Vec<i64>,

    /// Users to notify directly (list or comma-separated string)
    #[serde(default, deserialize_with = "deserialize_ids")]
    pub onebot_user_ids: Vec<i64>,
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self {
            onebot_enabled: false,
            onebot_http_url: String::new(),
            onebot_access_token: None,
            onebot_bot_qq: 0,
            onebot_group_ids: Vec::new(),
            onebot_user_ids: Vec::new(),
        }
    }
}

impl NotifySettings {
    /// Every configured target, groups first.
    pub fn targets(&self) -> Vec<Target> {
        self.onebot_group_ids
            .iter()
            .map(|id| Target::Group(*id))
            .chain(self.onebot_user_ids.iter().map(|id| Target::Private(*id)))
            .collect()
    }

    /// Whether the transport can be started at all.
    pub fn is_active(&self) -> bool {
        self.onebot_enabled && !self.onebot_http_url.trim().is_empty()
    }
}

/// Normalise a loosely typed id list.
///
/// Accepts an array of numbers or numeric strings, a single number, or a
/// comma-separated string. Entries that are not integers are skipped.
pub fn normalize_ids(value: &Value) -> Vec<i64> {
    match value {
        Value::Null => Vec::new(),
        Value::Number(n) => n.as_i64().into_iter().collect(),
        Value::String(s) => s
            .split(',')
            .filter_map(|p| p.trim().parse::<i64>().ok())
            .collect(),
        Value::Array(items) => items.iter().flat_map(normalize_ids).collect(),
        _ => Vec::new(),
    }
}

fn deserialize_ids<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<i64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(normalize_ids(&value))
}
