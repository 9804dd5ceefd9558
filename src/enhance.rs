//! Search-result enhancement: metadata search merged with streaming availability.

use crate::cache::{response_cache, CacheKey, ResponseCache};
use crate::catalog::hydrate;
use crate::error::{EnrichmentError, SearchError, UpstreamError};
use crate::gather::gather_partial;
use crate::geo::{tmdb_region, GeoContext};
use crate::matcher::titles_match;
use crate::models::Title;
use crate::streaming::{extract_platforms, StreamingApi, StreamingShow};
use crate::tmdb::TmdbApi;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Hydration fan-out cap per query.
pub const MAX_CANDIDATES: usize = 20;

const LANGUAGE_WORDS: &[&str] = &[
    "tamil",
    "telugu",
    "hindi",
    "kannada",
    "malayalam",
    "bengali",
    "marathi",
    "gujarati",
];

pub struct SearchService {
    tmdb: Arc<dyn TmdbApi>,
    streaming: Arc<dyn StreamingApi>,
    geo: Arc<GeoContext>,
    cache: ResponseCache<Vec<Title>>,
}

impl SearchService {
    pub fn new(
        tmdb: Arc<dyn TmdbApi>,
        streaming: Arc<dyn StreamingApi>,
        geo: Arc<GeoContext>,
        freshness: Duration,
    ) -> Self {
        Self {
            tmdb,
            streaming,
            geo,
            cache: response_cache(freshness),
        }
    }

    /// Metadata results for `query`, enriched with streaming platforms where available.
    ///
    /// An empty result is the "no results" outcome, not an error. Only a metadata outage
    /// surfaces as [`SearchError`]; streaming failures degrade to metadata-only titles.
    pub async fn search(&self, query: &str) -> Result<Vec<Title>, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        self.cache
            .try_get_with(
                CacheKey::new("enhanced-search", query),
                self.search_uncached(query),
            )
            .await
            .map_err(SearchError::Upstream)
    }

    async fn search_uncached(&self, query: &str) -> Result<Vec<Title>, UpstreamError> {
        let location = self.geo.location().await;
        let country = location.country.as_str();
        let streaming_country = location.streaming_country();
        debug!(%country, %streaming_country, "Searching for '{}'", query);

        let (metadata, streaming) = tokio::join!(
            self.metadata_titles(query, tmdb_region(country)),
            self.streaming.search_by_title(query, &streaming_country),
        );

        let titles = metadata?;
        if titles.is_empty() {
            return Ok(titles);
        }

        let candidates = streaming.unwrap_or_else(|e| {
            warn!("Error searching streaming platforms: {}", e);
            Vec::new()
        });
        if candidates.is_empty() {
            info!("No streaming results for '{}', using metadata results only", query);
            return Ok(titles);
        }

        Ok(self
            .enrich_batch(titles, &candidates, country, &streaming_country)
            .await)
    }

    async fn metadata_titles(&self, query: &str, region: &str) -> Result<Vec<Title>, UpstreamError> {
        let mut hits = self.tmdb.search_multi(query).await?;
        if hits.is_empty() {
            if let Some(stripped) = strip_language_words(query) {
                info!("Trying search without language suffix: '{}'", stripped);
                hits = self.tmdb.search_multi(&stripped).await?;
            }
        }
        hits.truncate(MAX_CANDIDATES);
        let titles = hydrate(self.tmdb.as_ref(), hits, region).await;
        info!("Number of titles found for '{}': {}", query, titles.len());
        Ok(titles)
    }

    /// Enriches every title concurrently; a failed attempt keeps the title as it was.
    async fn enrich_batch(
        &self,
        titles: Vec<Title>,
        candidates: &[StreamingShow],
        country: &str,
        streaming_country: &str,
    ) -> Vec<Title> {
        let results = gather_partial(
            titles
                .iter()
                .map(|t| self.enrich_title(t, candidates, country, streaming_country)),
        )
        .await;
        titles
            .into_iter()
            .zip(results)
            .map(|(original, result)| match result {
                Ok(enriched) => enriched,
                Err(e) => {
                    warn!("Error enhancing title with streaming data: {}", e);
                    original
                }
            })
            .collect()
    }

    async fn enrich_title(
        &self,
        title: &Title,
        candidates: &[StreamingShow],
        country: &str,
        streaming_country: &str,
    ) -> Result<Title, EnrichmentError> {
        let direct = candidates
            .iter()
            .find(|c| titles_match(&title.title, &c.title));
        if let Some(info) = direct.and_then(|c| c.streaming_info.as_ref()) {
            let platforms = extract_platforms(info, streaming_country);
            if !platforms.is_empty() {
                return Ok(title.with_platforms(platforms, country));
            }
        }

        // No usable direct match: try the first candidate's full detail.
        let Some(first) = candidates.first() else {
            return Ok(title.clone());
        };
        let details = self
            .streaming
            .show_details(first.kind, &first.id)
            .await
            .map_err(|source| EnrichmentError {
                title_id: title.id.clone(),
                source,
            })?;
        if let Some(info) = details.streaming_info.as_ref() {
            let platforms = extract_platforms(info, streaming_country);
            if !platforms.is_empty() {
                return Ok(title.with_platforms(platforms, country));
            }
        }
        Ok(title.clone())
    }
}

/// Drops regional-language words from a query that found nothing.
///
/// Returns `None` when nothing was removed or nothing would be left.
pub fn strip_language_words(query: &str) -> Option<String> {
    let mut removed = false;
    let kept: Vec<&str> = query
        .split_whitespace()
        .filter(|word| {
            let bare = word
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            let drop = LANGUAGE_WORDS.contains(&bare.as_str());
            removed |= drop;
            !drop
        })
        .collect();
    if !removed || kept.is_empty() {
        return None;
    }
    Some(kept.join(" "))
}
