use crate::cache::{response_cache, CacheKey, ResponseCache};
use crate::error::{HydrationError, UpstreamError};
use crate::gather::{gather_partial, successes};
use crate::geo::{tmdb_region, GeoContext};
use crate::models::{MediaKind, Title};
use crate::tmdb::{SearchHit, TmdbApi};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const POPULAR_PER_KIND: usize = 25;
const TRENDING_PER_KIND: usize = 10;

/// Hydrates search hits into full titles concurrently. Failed hits are logged and dropped;
/// survivors keep their input order.
pub async fn hydrate(tmdb: &dyn TmdbApi, hits: Vec<SearchHit>, region: &str) -> Vec<Title> {
    let results = gather_partial(hits.iter().map(|hit| async move {
        tmdb.fetch_details(hit.id, hit.kind, region)
            .await
            .map_err(|source| HydrationError {
                kind: hit.kind.tmdb_segment(),
                id: hit.id,
                source,
            })
    }))
    .await;
    successes(results, |e| warn!("Error fetching details: {}", e))
}

/// Browse lists shown when there is no query, plus single-title lookups.
pub struct Catalog {
    tmdb: Arc<dyn TmdbApi>,
    geo: Arc<GeoContext>,
    cache: ResponseCache<Vec<Title>>,
}

impl Catalog {
    pub fn new(tmdb: Arc<dyn TmdbApi>, geo: Arc<GeoContext>, freshness: Duration) -> Self {
        Self {
            tmdb,
            geo,
            cache: response_cache(freshness),
        }
    }

    /// Popular movies and series, movies first.
    pub async fn popular(&self) -> Result<Vec<Title>, Arc<UpstreamError>> {
        let region = tmdb_region(&self.geo.location().await.country);
        self.cache
            .try_get_with(CacheKey::new("popular", region), async {
                let (movies, series) = tokio::join!(
                    self.tmdb.popular(MediaKind::Movie),
                    self.tmdb.popular(MediaKind::Series)
                );
                let hits = merge_lists(movies, series, POPULAR_PER_KIND)?;
                let titles = hydrate(self.tmdb.as_ref(), hits, region).await;
                info!("Popular movies and series fetched: {}", titles.len());
                Ok::<_, UpstreamError>(titles)
            })
            .await
    }

    /// This week's trending movies and series, every title flagged as trending.
    pub async fn trending(&self) -> Result<Vec<Title>, Arc<UpstreamError>> {
        let region = tmdb_region(&self.geo.location().await.country);
        self.cache
            .try_get_with(CacheKey::new("trending", region), async {
                let (movies, series) = tokio::join!(
                    self.tmdb.trending(MediaKind::Movie),
                    self.tmdb.trending(MediaKind::Series)
                );
                let hits = merge_lists(movies, series, TRENDING_PER_KIND)?;
                let titles: Vec<Title> = hydrate(self.tmdb.as_ref(), hits, region)
                    .await
                    .into_iter()
                    .map(|t| Title {
                        trending: true,
                        ..t
                    })
                    .collect();
                info!("Trending movies and series fetched: {}", titles.len());
                Ok::<_, UpstreamError>(titles)
            })
            .await
    }

    pub async fn details(&self, kind: MediaKind, id: i32) -> Result<Title, UpstreamError> {
        let region = tmdb_region(&self.geo.location().await.country);
        self.tmdb.fetch_details(id, kind, region).await
    }
}

/// One failing list degrades to the other; both failing is an error.
fn merge_lists(
    movies: Result<Vec<SearchHit>, UpstreamError>,
    series: Result<Vec<SearchHit>, UpstreamError>,
    per_kind: usize,
) -> Result<Vec<SearchHit>, UpstreamError> {
    match (movies, series) {
        (Err(e), Err(other)) => {
            warn!("Both catalog lists failed: {}", other);
            Err(e)
        }
        (movies, series) => {
            let take = |list: Result<Vec<SearchHit>, UpstreamError>| match list {
                Ok(hits) => hits.into_iter().take(per_kind).collect::<Vec<_>>(),
                Err(e) => {
                    warn!("Catalog list failed: {}", e);
                    Vec::new()
                }
            };
            let mut hits = take(movies);
            hits.extend(take(series));
            Ok(hits)
        }
    }
}
