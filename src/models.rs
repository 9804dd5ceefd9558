use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Series,
}

impl MediaKind {
    /// Path segment used by the metadata API (`movie` / `tv`).
    pub fn tmdb_segment(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Series => "tv",
        }
    }

    /// Path segment / `show_type` used by the streaming-availability API.
    pub fn streaming_segment(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Series => "series",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.streaming_segment())
    }
}

impl FromStr for MediaKind {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "movie" => Ok(MediaKind::Movie),
            "series" | "tv" => Ok(MediaKind::Series),
            _ => Err(anyhow::anyhow!("media kind must be 'movie' or 'series'")),
        }
    }
}

/// One streaming service's offer for a title.
///
/// Identity for deduplication is `name`; no provider id survives across sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Platform {
    pub name: String,
    pub url: String,
    pub logo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streaming_link: Option<String>,
}

impl Platform {
    /// Where "watch now" should send the user: the direct streaming link wins over the generic url.
    pub fn destination(&self) -> &str {
        self.streaming_link.as_deref().unwrap_or(&self.url)
    }
}

/// Deduplicates platforms by display name, keeping the first occurrence.
pub fn dedupe_platforms(platforms: Vec<Platform>) -> Vec<Platform> {
    let mut out: Vec<Platform> = Vec::with_capacity(platforms.len());
    for platform in platforms {
        if !out.iter().any(|p| p.name == platform.name) {
            out.push(platform);
        }
    }
    out
}

/// The merged movie/series record handed to presentation.
///
/// `rating` is 0.0 when the title is unrated; there is no separate "unrated" state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Title {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub poster: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backdrop: Option<String>,
    pub year: Option<i32>,
    pub director: String,
    pub genres: Vec<String>,
    pub cast: Vec<String>,
    pub languages: Vec<String>,
    pub platforms: Vec<Platform>,
    pub regions: Vec<String>,
    #[serde(rename = "imdbRating")]
    pub rating: f32,
    #[serde(rename = "imdbVotes", default, skip_serializing_if = "Option::is_none")]
    pub votes: Option<u32>,
    #[serde(
        rename = "rottenTomatoesRating",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub critic_score: Option<u32>,
    pub synopsis: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seasons: Option<u32>,
    #[serde(default)]
    pub trending: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streaming_link: Option<String>,
}

impl Title {
    /// Returns a new title carrying streaming-availability platforms for `country`.
    pub fn with_platforms(&self, platforms: Vec<Platform>, country: &str) -> Title {
        Title {
            platforms: dedupe_platforms(platforms),
            regions: vec![country.to_string()],
            ..self.clone()
        }
    }
}

/// Sub-national language preference used to re-rank results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionPreference {
    pub region: String,
    pub languages: Vec<String>,
    pub display_name: String,
}

/// Resolved caller location. Cached once per process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub country: String,
    pub region: Option<String>,
    pub region_preference: Option<RegionPreference>,
}

impl Location {
    /// Lowercase alpha-2 code expected by the streaming-availability API.
    pub fn streaming_country(&self) -> String {
        self.country.to_lowercase()
    }
}

/// User-selected facets. Empty facet / zero threshold means the facet is off.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default)]
    pub min_rating: f32,
}

impl FilterState {
    pub fn is_empty(&self) -> bool {
        self.genres.is_empty()
            && self.languages.is_empty()
            && self.platforms.is_empty()
            && self.min_rating <= 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistItem {
    pub movie_id: String,
    pub added_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn platform(name: &str, url: &str, link: Option<&str>) -> Platform {
        Platform {
            name: name.to_string(),
            url: url.to_string(),
            logo: "📱".to_string(),
            logo_url: None,
            streaming_link: link.map(str::to_string),
        }
    }

    #[test]
    fn destination_prefers_streaming_link() {
        let direct = platform("Netflix", "https://www.netflix.com", Some("https://n.com/dune"));
        assert_eq!(direct.destination(), "https://n.com/dune");
        let generic = platform("Hulu", "https://www.hulu.com", None);
        assert_eq!(generic.destination(), "https://www.hulu.com");
    }

    #[test]
    fn dedupe_keeps_first_by_name() {
        let merged = dedupe_platforms(vec![
            platform("Hotstar", "https://a", None),
            platform("Netflix", "https://b", None),
            platform("Hotstar", "https://c", None),
        ]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].url, "https://a");
    }

    #[test]
    fn title_serializes_with_presentation_field_names() {
        let title = Title {
            id: "4".to_string(),
            title: "Dune".to_string(),
            kind: MediaKind::Movie,
            poster: "/placeholder.svg".to_string(),
            backdrop: None,
            year: Some(2021),
            director: "Denis Villeneuve".to_string(),
            genres: vec![],
            cast: vec![],
            languages: vec![],
            platforms: vec![],
            regions: vec![],
            rating: 8.0,
            votes: Some(10),
            critic_score: None,
            synopsis: String::new(),
            duration: Some("155 min".to_string()),
            seasons: None,
            trending: true,
            streaming_link: None,
        };
        let value = serde_json::to_value(&title).unwrap();
        assert_eq!(value["type"], "movie");
        assert_eq!(value["imdbRating"], 8.0);
        assert_eq!(value["imdbVotes"], 10);
        assert!(value.get("streamingLink").is_none());
    }
}
