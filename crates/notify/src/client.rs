//! Queued OneBot HTTP transport.
//!
//! Callers enqueue actions without waiting. A single transport task drains
//! the queue in order and posts each action to the OneBot HTTP API; when the
//! endpoint is unreachable the action is retried with exponential backoff.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::payload::{OutboundAction, Payload, Target};
use crate::{NotifyError, Result};

/// Anything that can accept a message for later delivery.
///
/// `send` only reports whether the message was accepted for delivery, never
/// whether it arrived.
pub trait Notifier: Send + Sync {
    /// Enqueue `payload` for `target`.
    fn send(&self, target: Target, payload: Payload) -> Result<()>;
}

/// Exponential reconnect delay: 1s, 2s, 4s, ... capped at 60s.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    /// Backoff with explicit bounds.
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self { initial, max, current: initial }
    }

    /// Delay to wait now; doubles the next one.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    /// Back to the initial delay after a success.
    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(60))
    }
}

/// Transport settings.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Base URL of the OneBot HTTP API
    pub base_url: String,
    /// Optional bearer token
    pub access_token: Option<String>,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl TransportConfig {
    /// Config with a 10 second request timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            access_token: None,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Handle to the transport task.
pub struct OneBotClient {
    tx: mpsc::UnboundedSender<OutboundAction>,
    pending: Arc<AtomicUsize>,
    shutdown: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl OneBotClient {
    /// Spawn the transport task on the current Tokio runtime.
    pub fn spawn(config: TransportConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (shutdown, shutdown_rx) = watch::channel(false);
        let pending = Arc::new(AtomicUsize::new(0));
        let transport = Transport::new(config, rx, shutdown_rx, pending.clone());
        let handle = tokio::spawn(transport.run());
        info!("OneBot transport started");
        Self { tx, pending, shutdown, handle: Mutex::new(Some(handle)) }
    }

    /// Enqueue a raw action.
    pub fn enqueue(&self, action: OutboundAction) -> Result<()> {
        debug!(action = %action.action, "enqueued");
        self.pending.fetch_add(1, Ordering::SeqCst);
        self.tx.send(action).map_err(|_| {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            NotifyError::QueueClosed
        })
    }

    /// Actions accepted but not yet sent or dropped.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Wait until the queue is drained, at most `grace`.
    ///
    /// Returns `false` if actions were still pending when `grace` ran out.
    pub async fn flush(&self, grace: Duration) -> bool {
        let drained = async {
            while self.pending() > 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        };
        tokio::time::timeout(grace, drained).await.is_ok()
    }

    /// Stop the transport; queued actions that were not sent are dropped.
    pub async fn shutdown(&self) {
        let _ = self.shutdown.send(true);
        let handle = self.handle.lock().ok().and_then(|mut h| h.take());
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

impl Notifier for OneBotClient {
    fn send(&self, target: Target, payload: Payload) -> Result<()> {
        self.enqueue(OutboundAction::new(target, &payload))
    }
}

struct Transport {
    http: reqwest::Client,
    config: TransportConfig,
    rx: mpsc::UnboundedReceiver<OutboundAction>,
    shutdown: watch::Receiver<bool>,
    pending: Arc<AtomicUsize>,
    backoff: Backoff,
}

#[derive(serde::Deserialize)]
struct ApiResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    retcode: i64,
    #[serde(default)]
    message: Option<String>,
}

impl Transport {
    fn new(
        config: TransportConfig,
        rx: mpsc::UnboundedReceiver<OutboundAction>,
        shutdown: watch::Receiver<bool>,
        pending: Arc<AtomicUsize>,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_default();
        Self { http, config, rx, shutdown, pending, backoff: Backoff::default() }
    }

    async fn run(mut self) {
        loop {
            let action = tokio::select! {
                _ = self.shutdown.changed() => break,
                next = self.rx.recv() => match next {
                    Some(action) => action,
                    None => break,
                },
            };
            let delivered = self.deliver(action).await;
            self.pending.fetch_sub(1, Ordering::SeqCst);
            if !delivered {
                break;
            }
        }
        info!("OneBot transport stopped");
    }

    /// Deliver one action, retrying while the endpoint is unreachable.
    /// Returns `false` if shutdown was requested meanwhile.
    async fn deliver(&mut self, action: OutboundAction) -> bool {
        loop {
            match self.post(&action).await {
                Ok(()) => {
                    self.backoff.reset();
                    debug!(action = %action.action, "sent");
                    return true;
                }
                Err(e @ NotifyError::Rejected { .. }) => {
                    warn!(action = %action.action, error = %e, "OneBot rejected action, dropping");
                    return true;
                }
                Err(e) => {
                    let delay = self.backoff.next_delay();
                    warn!(action = %action.action, error = %e, ?delay, "OneBot unreachable, retrying");
                    tokio::select! {
                        _ = self.shutdown.changed() => return false,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    async fn post(&self, action: &OutboundAction) -> Result<()> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), action.action);
        let mut request = self.http.post(&url).json(&action.params);
        if let Some(token) = &self.config.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected { status: status.as_u16(), message: body });
        }

        // The action was accepted; a body that cannot be read must not
        // cause a resend.
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                warn!(action = %action.action, error = %e, "OneBot response body unreadable, assuming sent");
                return Ok(());
            }
        };
        let body: ApiResponse = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(e) => {
                warn!(action = %action.action, error = %e, "OneBot response is not JSON, assuming sent");
                return Ok(());
            }
        };
        if body.status == "failed" {
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                message: body.message.unwrap_or_else(|| format!("retcode {}", body.retcode)),
            });
        }
        Ok(())
    }
}
