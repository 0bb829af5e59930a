//! OneBot message model: targets, segments and forwarded cards.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Where a message goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    /// Broadcast channel (group chat)
    Group(i64),
    /// Direct recipient
    Private(i64),
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Group(id) => write!(f, "group:{}", id),
            Target::Private(id) => write!(f, "user:{}", id),
        }
    }
}

/// One content block of a forwarded node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Segment {
    /// Plain text; newlines are kept inside one block
    Text {
        /// Text body
        text: String,
    },
    /// Image reference (`base64://...`, URL or file path)
    Image {
        /// Image source
        file: String,
    },
}

impl Segment {
    /// Text block.
    pub fn text(text: impl Into<String>) -> Self {
        Segment::Text { text: text.into() }
    }

    /// Image block carrying the bytes inline.
    pub fn image_bytes(bytes: &[u8]) -> Self {
        Segment::Image { file: format!("base64://{}", STANDARD.encode(bytes)) }
    }
}

/// One node of a forwarded card, displayed as if sent by `name`/`uin`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardNode {
    /// Display name
    pub name: String,
    /// Account the node is attributed to
    pub uin: String,
    /// Ordered content blocks
    pub content: Vec<Segment>,
}

/// A message to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Plain text message
    Text(String),
    /// Forwarded card made of nodes
    Forward(Vec<ForwardNode>),
}

/// A OneBot API call ready to be queued.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundAction {
    /// API action name, e.g. `send_group_forward_msg`
    pub action: String,
    /// JSON parameters
    pub params: Value,
}

impl OutboundAction {
    /// Build the API call that delivers `payload` to `target`.
    pub fn new(target: Target, payload: &Payload) -> Self {
        let (kind, key, id) = match target {
            Target::Group(id) => ("group", "group_id", id),
            Target::Private(id) => ("private", "user_id", id),
        };
        match payload {
            Payload::Text(text) => Self {
                action: format!("send_{}_msg", kind),
                params: json!({ key: id, "message": text }),
            },
            Payload::Forward(nodes) => {
                let messages: Vec<Value> = nodes
                    .iter()
                    .map(|n| json!({ "type": "node", "data": n }))
                    .collect();
                Self {
                    action: format!("send_{}_forward_msg", kind),
                    params: json!({ key: id, "messages": messages }),
                }
            }
        }
    }
}
