//! Fan-out of one payload to every configured target.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::client::Notifier;
use crate::payload::{ForwardNode, Payload, Segment};
use crate::settings::{NotifySettings, NODE_NAME};

/// Sends payloads to all targets in [`NotifySettings`], best effort.
#[derive(Clone)]
pub struct Broadcaster {
    notifier: Option<Arc<dyn Notifier>>,
    settings: NotifySettings,
}

impl Broadcaster {
    /// Broadcaster backed by `notifier`.
    pub fn new(notifier: Arc<dyn Notifier>, settings: NotifySettings) -> Self {
        Self { notifier: Some(notifier), settings }
    }

    /// Broadcaster that only logs.
    pub fn disabled() -> Self {
        Self { notifier: None, settings: NotifySettings::default() }
    }

    /// Current settings.
    pub fn settings(&self) -> &NotifySettings {
        &self.settings
    }

    /// Whether sends can go anywhere.
    pub fn is_enabled(&self) -> bool {
        self.notifier.is_some() && self.settings.onebot_enabled
    }

    /// Node attributed to the configured bot account.
    pub fn node(&self, content: Vec<Segment>) -> ForwardNode {
        ForwardNode {
            name: NODE_NAME.to_string(),
            uin: self.settings.onebot_bot_qq.to_string(),
            content,
        }
    }

    /// Enqueue `payload` for every target. Returns whether at least one
    /// target accepted it. Failures are logged, never returned.
    pub fn broadcast(&self, payload: &Payload) -> bool {
        let Some(notifier) = self.notifier.as_ref().filter(|_| self.settings.onebot_enabled) else {
            debug!("notifications disabled, skipping");
            return false;
        };

        let targets = self.settings.targets();
        if targets.is_empty() {
            warn!("notifications enabled but no targets configured");
            return false;
        }

        let mut sent_any = false;
        for target in targets {
            match notifier.send(target, payload.clone()) {
                Ok(()) => sent_any = true,
                Err(e) => warn!(%target, error = %e, "failed to enqueue notification"),
            }
        }
        sent_any
    }
}
