//! Regional re-ranking followed by the user's filter facets.

use crate::language::matches_any;
use crate::models::{FilterState, RegionPreference, Title};
use tracing::debug;

/// One independent filter dimension. Disabled facets keep everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facet {
    Genre,
    Language,
    Platform,
    Rating,
}

impl Facet {
    pub const ALL: [Facet; 4] = [Facet::Genre, Facet::Language, Facet::Platform, Facet::Rating];

    pub fn keeps(&self, title: &Title, filters: &FilterState) -> bool {
        match self {
            Facet::Genre => {
                filters.genres.is_empty()
                    || title.genres.iter().any(|g| filters.genres.contains(g))
            }
            Facet::Language => {
                if filters.languages.is_empty() {
                    return true;
                }
                let wanted: Vec<String> =
                    filters.languages.iter().map(|l| l.to_lowercase()).collect();
                title.languages.iter().any(|lang| {
                    let lang = lang.to_lowercase();
                    wanted
                        .iter()
                        .any(|w| lang.contains(w.as_str()) || w.contains(lang.as_str()))
                })
            }
            Facet::Platform => {
                filters.platforms.is_empty()
                    || title
                        .platforms
                        .iter()
                        .any(|p| filters.platforms.contains(&p.name))
            }
            Facet::Rating => filters.min_rating <= 0.0 || title.rating >= filters.min_rating,
        }
    }

    pub fn apply(&self, titles: Vec<Title>, filters: &FilterState) -> Vec<Title> {
        titles
            .into_iter()
            .filter(|t| self.keeps(t, filters))
            .collect()
    }
}

/// Stable partition: titles in a preferred language first, everything else after.
pub fn prioritize_region(titles: Vec<Title>, preference: Option<&RegionPreference>) -> Vec<Title> {
    let Some(pref) = preference.filter(|p| !p.languages.is_empty()) else {
        return titles;
    };
    let (regional, other): (Vec<Title>, Vec<Title>) = titles
        .into_iter()
        .partition(|t| matches_any(&t.languages, &pref.languages));
    debug!(
        region = %pref.region,
        regional = regional.len(),
        other = other.len(),
        "Applied regional language preference"
    );
    regional.into_iter().chain(other).collect()
}

/// Every facet, in declaration order. The facets commute.
pub fn apply_filters(titles: Vec<Title>, filters: &FilterState) -> Vec<Title> {
    if filters.is_empty() {
        return titles;
    }
    Facet::ALL
        .iter()
        .fold(titles, |acc, facet| facet.apply(acc, filters))
}

/// The final display list: regional partition first, then the filters.
pub fn rank_and_filter(
    titles: Vec<Title>,
    preference: Option<&RegionPreference>,
    filters: &FilterState,
) -> Vec<Title> {
    apply_filters(prioritize_region(titles, preference), filters)
}
