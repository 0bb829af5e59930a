//! Sampler collaborator: fetches counters and metadata for one item.

use std::time::Duration;

use async_trait::async_trait;
use milestone_core::{ItemId, StatSnapshot, VideoMetadata};
use reqwest::{Client, ClientBuilder};
use serde::Deserialize;
use tracing::debug;

use crate::FetchError;

/// Public video info endpoint.
pub const VIEW_API: &str = "https://api.bilibili.com/x/web-interface/view";

/// Source of statistics for tracked items.
#[async_trait]
pub trait Sampler: Send + Sync {
    /// Current counters, called once per tick.
    async fn fetch_stats(&self, id: &ItemId) -> Result<StatSnapshot, FetchError>;

    /// Title and cover URL, called once per session.
    async fn fetch_metadata(&self, id: &ItemId) -> Result<VideoMetadata, FetchError>;

    /// Raw bytes of a cover image.
    async fn fetch_cover(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

#[derive(Debug, Deserialize)]
struct Envelope {
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<ViewData>,
}

#[derive(Debug, Default, Deserialize)]
struct ViewData {
    #[serde(default)]
    title: String,
    #[serde(default)]
    pic: Option<String>,
    #[serde(default)]
    stat: ViewStat,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ViewStat {
    view: u64,
    like: u64,
    coin: u64,
    reply: u64,
    share: u64,
    danmaku: u64,
    favorite: u64,
}

impl From<ViewStat> for StatSnapshot {
    fn from(s: ViewStat) -> Self {
        StatSnapshot {
            view: s.view,
            like: s.like,
            coin: s.coin,
            reply: s.reply,
            share: s.share,
            danmaku: s.danmaku,
            favorite: s.favorite,
        }
    }
}

fn decode(body: &str) -> Result<ViewData, FetchError> {
    let envelope: Envelope =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;
    if envelope.code != 0 {
        return Err(FetchError::Api { code: envelope.code, message: envelope.message });
    }
    envelope
        .data
        .ok_or_else(|| FetchError::Decode("response has no data".to_string()))
}

/// [`Sampler`] backed by the public Bilibili web API.
#[derive(Clone)]
pub struct BilibiliSampler {
    client: Client,
    endpoint: String,
}

impl BilibiliSampler {
    /// Sampler with a 10 second request timeout.
    pub fn new() -> Self {
        Self::with_endpoint(VIEW_API, Duration::from_secs(10))
    }

    /// Sampler against a custom endpoint.
    pub fn with_endpoint(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: ClientBuilder::new()
                .timeout(timeout)
                .user_agent(concat!("milestone/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
        }
    }

    async fn view(&self, id: &ItemId) -> Result<ViewData, FetchError> {
        debug!(item = %id, "fetching video info");
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("bvid", id.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(FetchError::Api { code: status.as_u16() as i64, message: body });
        }
        decode(&body)
    }
}

impl Default for BilibiliSampler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sampler for BilibiliSampler {
    async fn fetch_stats(&self, id: &ItemId) -> Result<StatSnapshot, FetchError> {
        Ok(self.view(id).await?.stat.into())
    }

    async fn fetch_metadata(&self, id: &ItemId) -> Result<VideoMetadata, FetchError> {
        let data = self.view(id).await?;
        Ok(VideoMetadata {
            title: data.title,
            cover_url: data.pic.filter(|p| !p.is_empty()),
        })
    }

    async fn fetch_cover(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}
