//! Freshness-window cache for upstream results.
//!
//! Entries are keyed by endpoint plus normalised parameters and expire once older than the
//! configured window. Callers go through `try_get_with`, so a failed fetch is never stored
//! and concurrent misses on one key share a single upstream call.

use moka::future::Cache;
use std::time::Duration;

const MAX_ENTRIES: u64 = 512;

pub type ResponseCache<V> = Cache<CacheKey, V>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub endpoint: &'static str,
    pub params: String,
}

impl CacheKey {
    /// Builds a key with parameters trimmed, lowercased and whitespace-collapsed.
    pub fn new(endpoint: &'static str, params: &str) -> Self {
        let params = params
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        Self { endpoint, params }
    }
}

pub fn response_cache<V>(freshness: Duration) -> ResponseCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    Cache::builder()
        .max_capacity(MAX_ENTRIES)
        .time_to_live(freshness)
        .build()
}
