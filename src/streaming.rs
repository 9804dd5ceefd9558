use crate::error::UpstreamError;
use crate::models::{MediaKind, Platform};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::warn;

const STREAMING_BASE: &str = "https://streaming-availability.p.rapidapi.com";
const RAPIDAPI_HOST: &str = "streaming-availability.p.rapidapi.com";
const SERVICE: &str = "streaming-availability";
const DEFAULT_LOGO: &str = "📱";

/// Per-country, per-platform offers keyed by lowercase country then platform key.
pub type StreamingInfo = BTreeMap<String, BTreeMap<String, Vec<StreamingOffer>>>;

/// Streaming-availability source, keyed independently of the metadata source.
#[async_trait]
pub trait StreamingApi: Send + Sync {
    async fn search_by_title(
        &self,
        title: &str,
        country: &str,
    ) -> Result<Vec<StreamingShow>, UpstreamError>;
    async fn show_details(&self, kind: MediaKind, id: &str)
        -> Result<StreamingShow, UpstreamError>;
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingShow {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub streaming_info: Option<StreamingInfo>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingOffer {
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub video_quality: Option<String>,
    #[serde(default)]
    pub audios: Vec<OfferAudio>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OfferAudio {
    pub language: String,
    #[serde(default)]
    pub region: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StreamingClient {
    client: Client,
    api_key: String,
    base: String,
}

impl StreamingClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .user_agent(format!("bingefast/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build streaming-availability HTTP client")?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base: STREAMING_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, UpstreamError> {
        let url = format!("{}{endpoint}", self.base);
        let res = self
            .client
            .get(&url)
            .header("x-rapidapi-host", RAPIDAPI_HOST)
            .header("x-rapidapi-key", &self.api_key)
            .send()
            .await
            .map_err(|source| UpstreamError::Transport {
                service: SERVICE,
                source,
            })?;
        let status = res.status();
        let text = res.text().await.map_err(|source| UpstreamError::Transport {
            service: SERVICE,
            source,
        })?;
        if !status.is_success() {
            return Err(UpstreamError::Status {
                service: SERVICE,
                status: status.as_u16(),
                body: text,
            });
        }
        serde_json::from_str(&text).map_err(|source| UpstreamError::Decode {
            service: SERVICE,
            source,
        })
    }

    async fn search_kind(
        &self,
        title: &str,
        country: &str,
        kind: MediaKind,
    ) -> Result<Vec<StreamingShow>, UpstreamError> {
        let endpoint = format!(
            "/search/title?title={}&country={country}&show_type={}",
            urlencoding::encode(title),
            kind.streaming_segment()
        );
        let raw: Option<Vec<serde_json::Value>> = self.get_json(&endpoint).await?;
        Ok(parse_candidates(raw.unwrap_or_default()))
    }
}

#[async_trait]
impl StreamingApi for StreamingClient {
    /// Movie candidates first, then series.
    async fn search_by_title(
        &self,
        title: &str,
        country: &str,
    ) -> Result<Vec<StreamingShow>, UpstreamError> {
        let (movies, series) = tokio::try_join!(
            self.search_kind(title, country, MediaKind::Movie),
            self.search_kind(title, country, MediaKind::Series),
        )?;
        Ok(movies.into_iter().chain(series).collect())
    }

    async fn show_details(
        &self,
        kind: MediaKind,
        id: &str,
    ) -> Result<StreamingShow, UpstreamError> {
        let endpoint = format!(
            "/shows/{}/{}",
            kind.streaming_segment(),
            urlencoding::encode(id)
        );
        self.get_json(&endpoint).await
    }
}

/// Keeps every candidate that decodes; a malformed one is logged and skipped.
fn parse_candidates(raw: Vec<serde_json::Value>) -> Vec<StreamingShow> {
    raw.into_iter()
        .filter_map(|value| match serde_json::from_value::<StreamingShow>(value) {
            Ok(show) => Some(show),
            Err(e) => {
                warn!("Skipping malformed streaming candidate: {}", e);
                None
            }
        })
        .collect()
}

/// Platforms offered in `country` (lowercase alpha-2), one per platform key.
///
/// A platform counts only when its first offer carries a link. Keys come out sorted.
pub fn extract_platforms(info: &StreamingInfo, country: &str) -> Vec<Platform> {
    let Some(country_data) = info.get(country) else {
        return Vec::new();
    };
    country_data
        .iter()
        .filter_map(|(key, offers)| {
            let link = offers.first()?.link.as_deref()?;
            if link.is_empty() {
                return None;
            }
            let (name, logo) = platform_branding(key);
            Some(Platform {
                name,
                url: link.to_string(),
                logo: logo.to_string(),
                logo_url: None,
                streaming_link: Some(link.to_string()),
            })
        })
        .collect()
}

fn platform_branding(key: &str) -> (String, &'static str) {
    let (name, logo) = match key {
        "netflix" => ("Netflix", "🎬"),
        "prime" => ("Prime Video", "📺"),
        "hotstar" => ("Disney+ Hotstar", "⭐"),
        "zee5" => ("ZEE5", "🎪"),
        "sonyliv" => ("Sony LIV", "📱"),
        "voot" => ("Voot", "🔷"),
        "mxplayer" => ("MX Player", "🎮"),
        "youtube" => ("YouTube", "📹"),
        "hulu" => ("Hulu", "🟢"),
        "disney" => ("Disney+", "🏰"),
        "hbo" => ("HBO Max", "🎭"),
        "apple" => ("Apple TV+", "🍎"),
        "paramount" => ("Paramount+", "⛰️"),
        other => return (other.to_string(), DEFAULT_LOGO),
    };
    (name.to_string(), logo)
}
