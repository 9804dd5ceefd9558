use crate::error::UpstreamError;
use crate::models::{dedupe_platforms, MediaKind, Platform, Title};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

const TMDB_BASE: &str = "https://api.themoviedb.org/3";
const IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w500";
const LOGO_BASE: &str = "https://image.tmdb.org/t/p/w45";
const POSTER_PLACEHOLDER: &str = "/placeholder.svg";
const SERVICE: &str = "tmdb";
const CAST_LIMIT: usize = 5;
const TRENDING_THRESHOLD: f32 = 7.5;

/// Metadata source: search hits and fully hydrated titles.
#[async_trait]
pub trait TmdbApi: Send + Sync {
    async fn search_multi(&self, query: &str) -> Result<Vec<SearchHit>, UpstreamError>;
    async fn popular(&self, kind: MediaKind) -> Result<Vec<SearchHit>, UpstreamError>;
    async fn trending(&self, kind: MediaKind) -> Result<Vec<SearchHit>, UpstreamError>;
    async fn fetch_details(
        &self,
        id: i32,
        kind: MediaKind,
        region: &str,
    ) -> Result<Title, UpstreamError>;
}

/// A candidate title from a search or list endpoint, before hydration.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: i32,
    pub kind: MediaKind,
    pub name: String,
    pub year: Option<i32>,
    pub rating: f32,
    pub vote_count: u32,
    pub genre_ids: Vec<i32>,
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    api_key: String,
    base: String,
}

impl TmdbClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .user_agent(format!("bingefast/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build TMDB HTTP client")?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base: TMDB_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, UpstreamError> {
        let sep = if endpoint.contains('?') { '&' } else { '?' };
        let url = format!("{}{endpoint}{sep}api_key={}", self.base, self.api_key);
        let res = self
            .client
            .get(&url)
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

    async fn list(&self, endpoint: &str, kind: MediaKind) -> Result<Vec<SearchHit>, UpstreamError> {
        let page: ResultsPage = self.get_json(endpoint).await?;
        Ok(page
            .results
            .into_iter()
            .filter_map(|raw| raw.into_hit(Some(kind)))
            .collect())
    }
}

#[async_trait]
impl TmdbApi for TmdbClient {
    async fn search_multi(&self, query: &str) -> Result<Vec<SearchHit>, UpstreamError> {
        let endpoint = format!("/search/multi?query={}", urlencoding::encode(query));
        let page: ResultsPage = self.get_json(&endpoint).await?;
        Ok(page
            .results
            .into_iter()
            .filter_map(|raw| raw.into_hit(None))
            .collect())
    }

    async fn popular(&self, kind: MediaKind) -> Result<Vec<SearchHit>, UpstreamError> {
        self.list(&format!("/{}/popular", kind.tmdb_segment()), kind)
            .await
    }

    async fn trending(&self, kind: MediaKind) -> Result<Vec<SearchHit>, UpstreamError> {
        self.list(&format!("/trending/{}/week", kind.tmdb_segment()), kind)
            .await
    }

    async fn fetch_details(
        &self,
        id: i32,
        kind: MediaKind,
        region: &str,
    ) -> Result<Title, UpstreamError> {
        let endpoint = format!(
            "/{}/{id}?append_to_response=credits,watch/providers&watch_providers_region={region}",
            kind.tmdb_segment()
        );
        let detail: Detail = self.get_json(&endpoint).await?;
        Ok(detail.into_title(kind, region))
    }
}

#[derive(Debug, Deserialize)]
struct ResultsPage {
    #[serde(default)]
    results: Vec<RawHit>,
}

#[derive(Debug, Deserialize)]
struct RawHit {
    id: i32,
    media_type: Option<String>,
    title: Option<String>,
    name: Option<String>,
    release_date: Option<String>,
    first_air_date: Option<String>,
    #[serde(default)]
    vote_average: f32,
    #[serde(default)]
    vote_count: u32,
    #[serde(default)]
    genre_ids: Vec<i32>,
}

impl RawHit {
    /// Multi-search mixes people in; only movies and tv survive.
    fn into_hit(self, forced: Option<MediaKind>) -> Option<SearchHit> {
        let kind = match forced {
            Some(k) => k,
            None => match self.media_type.as_deref() {
                Some("movie") => MediaKind::Movie,
                Some("tv") => MediaKind::Series,
                _ => return None,
            },
        };
        let date = self.release_date.or(self.first_air_date);
        Some(SearchHit {
            id: self.id,
            kind,
            name: self.title.or(self.name).unwrap_or_default(),
            year: date.as_deref().and_then(extract_year),
            rating: round_rating(self.vote_average),
            vote_count: self.vote_count,
            genre_ids: self.genre_ids,
        })
    }
}

#[derive(Debug, Deserialize)]
struct Genre {
    name: String,
}

#[derive(Debug, Deserialize)]
struct SpokenLanguage {
    name: String,
    #[serde(default)]
    english_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Credits {
    #[serde(default)]
    cast: Vec<CastMember>,
    #[serde(default)]
    crew: Vec<CrewMember>,
}

#[derive(Debug, Deserialize)]
struct CastMember {
    name: String,
}

#[derive(Debug, Deserialize)]
struct CrewMember {
    job: Option<String>,
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct WatchProviders {
    #[serde(default)]
    results: HashMap<String, RegionProviders>,
}

#[derive(Debug, Default, Deserialize)]
struct RegionProviders {
    link: Option<String>,
    #[serde(default)]
    flatrate: Vec<Provider>,
    #[serde(default)]
    rent: Vec<Provider>,
    #[serde(default)]
    buy: Vec<Provider>,
}

#[derive(Debug, Clone, Deserialize)]
struct Provider {
    provider_id: i32,
    provider_name: String,
    logo_path: Option<String>,
}

/// Movie and tv details share one shape; the kind-specific fields are optional.
#[derive(Debug, Deserialize)]
struct Detail {
    id: i32,
    title: Option<String>,
    name: Option<String>,
    #[serde(default)]
    overview: String,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    release_date: Option<String>,
    first_air_date: Option<String>,
    runtime: Option<u32>,
    number_of_seasons: Option<u32>,
    #[serde(default)]
    genres: Vec<Genre>,
    #[serde(default)]
    spoken_languages: Vec<SpokenLanguage>,
    #[serde(default)]
    vote_average: f32,
    #[serde(default)]
    vote_count: u32,
    #[serde(default)]
    credits: Credits,
    #[serde(rename = "watch/providers", default)]
    watch_providers: WatchProviders,
}

impl Detail {
    fn into_title(self, kind: MediaKind, region: &str) -> Title {
        let director = self
            .credits
            .crew
            .iter()
            .find(|c| match kind {
                MediaKind::Movie => c.job.as_deref() == Some("Director"),
                MediaKind::Series => matches!(c.job.as_deref(), Some("Director" | "Creator")),
            })
            .map(|c| c.name.clone())
            .unwrap_or_else(|| "Unknown".to_string());
        let cast = self
            .credits
            .cast
            .iter()
            .take(CAST_LIMIT)
            .map(|c| c.name.clone())
            .collect();
        let region_providers = self.watch_providers.results.get(region);
        let streaming_link = region_providers.and_then(|r| r.link.clone());
        let platforms = region_providers
            .map(|r| providers_to_platforms(r, streaming_link.as_deref()))
            .unwrap_or_default();
        let regions = if platforms.is_empty() {
            Vec::new()
        } else {
            vec![region.to_string()]
        };
        let date = match kind {
            MediaKind::Movie => self.release_date.as_deref(),
            MediaKind::Series => self.first_air_date.as_deref(),
        };
        let mut genres: Vec<String> = Vec::with_capacity(self.genres.len());
        for g in self.genres {
            if !genres.contains(&g.name) {
                genres.push(g.name);
            }
        }

        Title {
            id: self.id.to_string(),
            title: self.title.or(self.name).unwrap_or_default(),
            kind,
            poster: self
                .poster_path
                .map(|p| format!("{IMAGE_BASE}{p}"))
                .unwrap_or_else(|| POSTER_PLACEHOLDER.to_string()),
            backdrop: self.backdrop_path.map(|p| format!("{IMAGE_BASE}{p}")),
            year: date.and_then(extract_year),
            director,
            genres,
            cast,
            languages: self
                .spoken_languages
                .into_iter()
                .map(|l| match l.english_name {
                    Some(en) if l.name.is_empty() => en,
                    _ => l.name,
                })
                .collect(),
            platforms,
            regions,
            rating: round_rating(self.vote_average),
            votes: Some(self.vote_count),
            critic_score: None,
            synopsis: self.overview,
            duration: match kind {
                MediaKind::Movie => self.runtime.map(|r| format!("{r} min")),
                MediaKind::Series => None,
            },
            seasons: match kind {
                MediaKind::Movie => None,
                MediaKind::Series => self.number_of_seasons,
            },
            trending: self.vote_average > TRENDING_THRESHOLD,
            streaming_link,
        }
    }
}

/// Flatrate, rent and buy offers for one region, deduplicated, in that order.
fn providers_to_platforms(region: &RegionProviders, link: Option<&str>) -> Vec<Platform> {
    let mut seen_ids: Vec<i32> = Vec::new();
    let mut platforms = Vec::new();
    for provider in region
        .flatrate
        .iter()
        .chain(region.rent.iter())
        .chain(region.buy.iter())
    {
        if seen_ids.contains(&provider.provider_id) {
            continue;
        }
        seen_ids.push(provider.provider_id);
        let (name, logo) = provider_branding(&provider.provider_name);
        platforms.push(Platform {
            name,
            url: link.map(str::to_string).unwrap_or_else(|| {
                format!(
                    "https://www.{}.com",
                    provider
                        .provider_name
                        .to_lowercase()
                        .split_whitespace()
                        .collect::<String>()
                )
            }),
            logo,
            logo_url: provider.logo_path.as_ref().map(|p| format!("{LOGO_BASE}{p}")),
            streaming_link: link.map(str::to_string),
        });
    }
    dedupe_platforms(platforms)
}

fn provider_branding(provider_name: &str) -> (String, String) {
    let (name, logo) = match provider_name {
        "Netflix" => ("Netflix", "🎬"),
        "Amazon Prime Video" => ("Prime Video", "📺"),
        "Disney Plus" => ("Disney+", "🏰"),
        "Hotstar" | "Disney+ Hotstar" => ("Hotstar", "⭐"),
        "Hulu" => ("Hulu", "🟢"),
        "HBO Max" => ("HBO Max", "🎭"),
        "Apple TV Plus" => ("Apple TV+", "🍎"),
        "Paramount Plus" => ("Paramount+", "⛰️"),
        "YouTube" => ("YouTube", "📹"),
        "Sony LIV" => ("Sony LIV", "📱"),
        "ZEE5" => ("ZEE5", "🎪"),
        "Voot" => ("Voot", "🔷"),
        "MX Player" => ("MX Player", "🎮"),
        other => return (other.to_string(), "📱".to_string()),
    };
    (name.to_string(), logo.to_string())
}

fn extract_year(date: &str) -> Option<i32> {
    date.split('-').next().and_then(|y| y.parse().ok())
}

fn round_rating(vote_average: f32) -> f32 {
    (vote_average * 10.0).round() / 10.0
}
