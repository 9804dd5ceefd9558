//! Caller geolocation and the regional language preference derived from it.
//!
//! Resolution happens at most once per [`GeoContext`]: concurrent first callers share a
//! single in-flight lookup and every later call reads the cached [`Location`].

use crate::error::UpstreamError;
use crate::models::{Location, RegionPreference};
use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{info, warn};

const IPAPI_URL: &str = "https://ipapi.co/json/";
const IPINFO_URL: &str = "https://ipinfo.io/json";

/// The one country whose sub-regions carry a language preference.
const REGIONAL_COUNTRY: &str = "IN";

static INDIA_REGIONS: Lazy<HashMap<&'static str, RegionPreference>> = Lazy::new(|| {
    let table: &[(&str, &[&str])] = &[
        ("Tamil Nadu", &["Tamil", "English"]),
        ("Andhra Pradesh", &["Telugu", "English"]),
        ("Telangana", &["Telugu", "English"]),
        ("Karnataka", &["Kannada", "English"]),
        ("Kerala", &["Malayalam", "English"]),
        ("West Bengal", &["Bengali", "Hindi", "English"]),
        ("Maharashtra", &["Marathi", "Hindi", "English"]),
        ("Gujarat", &["Gujarati", "Hindi", "English"]),
        ("Rajasthan", &["Hindi", "English"]),
        ("Punjab", &["Punjabi", "Hindi", "English"]),
        ("Haryana", &["Hindi", "English"]),
        ("Uttar Pradesh", &["Hindi", "English"]),
        ("Bihar", &["Hindi", "English"]),
        ("Madhya Pradesh", &["Hindi", "English"]),
        ("Odisha", &["Odia", "Hindi", "English"]),
        ("Assam", &["Assamese", "Hindi", "English"]),
    ];
    table
        .iter()
        .map(|(region, languages)| {
            (
                *region,
                RegionPreference {
                    region: region.to_string(),
                    languages: languages.iter().map(|l| l.to_string()).collect(),
                    display_name: format!("{region}, India"),
                },
            )
        })
        .collect()
});

/// Region preference for an exact region name; only one country has any.
pub fn region_preference(country: &str, region: &str) -> Option<RegionPreference> {
    if country != REGIONAL_COUNTRY {
        return None;
    }
    INDIA_REGIONS.get(region).cloned()
}

/// Preferred languages for a location, most preferred first.
pub fn preferred_languages(country: &str, region: Option<&str>) -> Vec<String> {
    if let Some(pref) = region.and_then(|r| region_preference(country, r)) {
        return pref.languages;
    }
    let defaults: &[&str] = match country {
        "IN" => &["Hindi", "English"],
        "US" | "GB" | "AU" => &["English"],
        "CA" => &["English", "French"],
        "DE" => &["German"],
        "FR" => &["French"],
        "BR" => &["Portuguese"],
        "MX" => &["Spanish"],
        "JP" => &["Japanese"],
        "KR" => &["Korean"],
        _ => &["English"],
    };
    defaults.iter().map(|l| l.to_string()).collect()
}

/// Watch-provider region understood by the metadata API.
pub fn tmdb_region(country: &str) -> &'static str {
    match country {
        "IN" => "IN",
        "US" => "US",
        "GB" => "GB",
        "CA" => "CA",
        "AU" => "AU",
        "DE" => "DE",
        "FR" => "FR",
        "BR" => "BR",
        "MX" => "MX",
        "JP" => "JP",
        "KR" => "KR",
        _ => "US",
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoLookup {
    pub country_code: Option<String>,
    pub region: Option<String>,
}

#[async_trait]
pub trait GeoProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn lookup(&self) -> Result<GeoLookup, UpstreamError>;
}

#[derive(Debug, Clone, Copy)]
enum GeoSchema {
    IpApi,
    IpInfo,
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    country_code: Option<String>,
    region: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IpInfoResponse {
    country: Option<String>,
    region: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HttpGeoProvider {
    client: Client,
    name: &'static str,
    url: String,
    schema: GeoSchema,
}

impl HttpGeoProvider {
    fn new(name: &'static str, url: &str, schema: GeoSchema, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .build()
            .context("Failed to build geolocation HTTP client")?;
        Ok(Self {
            client,
            name,
            url: url.to_string(),
            schema,
        })
    }

    pub fn ipapi(timeout: Duration) -> Result<Self> {
        Self::new("ipapi.co", IPAPI_URL, GeoSchema::IpApi, timeout)
    }

    pub fn ipinfo(timeout: Duration) -> Result<Self> {
        Self::new("ipinfo.io", IPINFO_URL, GeoSchema::IpInfo, timeout)
    }
}

#[async_trait]
impl GeoProvider for HttpGeoProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn lookup(&self) -> Result<GeoLookup, UpstreamError> {
        let res = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|source| UpstreamError::Transport {
                service: self.name,
                source,
            })?;
        let status = res.status();
        let text = res.text().await.map_err(|source| UpstreamError::Transport {
            service: self.name,
            source,
        })?;
        if !status.is_success() {
            return Err(UpstreamError::Status {
                service: self.name,
                status: status.as_u16(),
                body: text,
            });
        }
        let decode = |source: serde_json::Error| UpstreamError::Decode {
            service: self.name,
            source,
        };
        Ok(match self.schema {
            GeoSchema::IpApi => {
                let r: IpApiResponse = serde_json::from_str(&text).map_err(decode)?;
                GeoLookup {
                    country_code: r.country_code,
                    region: r.region,
                }
            }
            GeoSchema::IpInfo => {
                let r: IpInfoResponse = serde_json::from_str(&text).map_err(decode)?;
                GeoLookup {
                    country_code: r.country,
                    region: r.region,
                }
            }
        })
    }
}

/// Lazily resolved, once-only location shared by reference with every consumer.
pub struct GeoContext {
    providers: Vec<Arc<dyn GeoProvider>>,
    default_country: String,
    resolved: OnceCell<Location>,
}

impl GeoContext {
    pub fn new(providers: Vec<Arc<dyn GeoProvider>>, default_country: impl Into<String>) -> Self {
        Self {
            providers,
            default_country: default_country.into().to_uppercase(),
            resolved: OnceCell::new(),
        }
    }

    /// The standard chain: ipapi.co, then ipinfo.io, then the default country.
    pub fn from_http(default_country: &str, timeout: Duration) -> Result<Self> {
        Ok(Self::new(
            vec![
                Arc::new(HttpGeoProvider::ipapi(timeout)?) as Arc<dyn GeoProvider>,
                Arc::new(HttpGeoProvider::ipinfo(timeout)?),
            ],
            default_country,
        ))
    }

    /// A context that is already resolved and never performs a lookup.
    pub fn fixed(location: Location) -> Self {
        Self {
            providers: Vec::new(),
            default_country: location.country.clone(),
            resolved: OnceCell::new_with(Some(location)),
        }
    }

    pub async fn location(&self) -> &Location {
        self.resolved.get_or_init(|| self.resolve()).await
    }

    async fn resolve(&self) -> Location {
        for provider in &self.providers {
            match provider.lookup().await {
                Ok(found) => {
                    let location = self.location_from(found);
                    info!(
                        provider = provider.name(),
                        country = %location.country,
                        region = ?location.region,
                        preference = ?location.region_preference.as_ref().map(|p| &p.display_name),
                        "User location detected"
                    );
                    return location;
                }
                Err(e) => warn!("Failed to get location from {}: {}", provider.name(), e),
            }
        }
        info!("Using default location: {}", self.default_country);
        Location {
            country: self.default_country.clone(),
            region: None,
            region_preference: None,
        }
    }

    fn location_from(&self, found: GeoLookup) -> Location {
        let country = found
            .country_code
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| self.default_country.clone());
        let region = found.region.filter(|r| !r.trim().is_empty());
        let region_preference = region
            .as_deref()
            .and_then(|r| region_preference(&country, r));
        Location {
            country,
            region,
            region_preference,
        }
    }
}
