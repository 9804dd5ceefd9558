use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const REQUIRED_VARS: [&str; 2] = ["TMDB_API_KEY", "RAPIDAPI_KEY"];

/// Runtime settings read from the environment (`.env` supported).
#[derive(Debug, Clone)]
pub struct Config {
    pub tmdb_api_key: String,
    pub rapidapi_key: String,
    pub bind: SocketAddr,
    pub watchlist_path: PathBuf,
    pub default_country: String,
    pub upstream_timeout: Duration,
    pub search_freshness: Duration,
    pub catalog_freshness: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| anyhow::anyhow!("Missing required environment variable: {}", key))
        };
        let or_default = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            tmdb_api_key: required("TMDB_API_KEY")?,
            rapidapi_key: required("RAPIDAPI_KEY")?,
            bind: parse_value("BINGEFAST_BIND", &or_default("BINGEFAST_BIND", "0.0.0.0:3146"))?,
            watchlist_path: PathBuf::from(or_default("WATCHLIST_PATH", "watchlist.json")),
            default_country: or_default("DEFAULT_COUNTRY", "US").trim().to_uppercase(),
            upstream_timeout: seconds(&get, "UPSTREAM_TIMEOUT_SECS", 15)?,
            search_freshness: seconds(&get, "SEARCH_CACHE_SECS", 300)?,
            catalog_freshness: seconds(&get, "CATALOG_CACHE_SECS", 1800)?,
        })
    }
}

fn seconds(get: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Result<Duration> {
    let secs = match get(key) {
        Some(raw) => parse_value::<u64>(key, &raw)?,
        None => default,
    };
    Ok(Duration::from_secs(secs))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("Invalid value for {}: {:?}", key, raw))
}
