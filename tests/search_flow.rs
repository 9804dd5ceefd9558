use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use bingefast::app::{build_router, AppState};
use bingefast::config::Config;
use bingefast::error::UpstreamError;
use bingefast::geo::{region_preference, GeoContext};
use bingefast::models::{Location, MediaKind, Title};
use bingefast::streaming::{StreamingApi, StreamingInfo, StreamingOffer, StreamingShow};
use bingefast::tmdb::{SearchHit, TmdbApi};
use bingefast::watchlist::{MemoryStore, Watchlist};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::util::ServiceExt;

fn unavailable(service: &'static str) -> UpstreamError {
    UpstreamError::Status {
        service,
        status: 503,
        body: "service unavailable".to_string(),
    }
}

fn title(id: i32, name: &str, languages: &[&str], rating: f32) -> Title {
    Title {
        id: id.to_string(),
        title: name.to_string(),
        kind: MediaKind::Movie,
        poster: "/placeholder.svg".to_string(),
        backdrop: None,
        year: Some(2021),
        director: "Denis Villeneuve".to_string(),
        genres: vec!["Science Fiction".to_string()],
        cast: vec![],
        languages: languages.iter().map(|l| l.to_string()).collect(),
        platforms: vec![],
        regions: vec![],
        rating,
        votes: Some(1000),
        critic_score: None,
        synopsis: String::new(),
        duration: Some("155 min".to_string()),
        seasons: None,
        trending: false,
        streaming_link: None,
    }
}

struct FakeTmdb {
    titles: Vec<Title>,
    fail: bool,
}

#[async_trait::async_trait]
impl TmdbApi for FakeTmdb {
    async fn search_multi(&self, query: &str) -> Result<Vec<SearchHit>, UpstreamError> {
        if self.fail {
            return Err(unavailable("tmdb"));
        }
        let q = query.to_lowercase();
        Ok(self
            .titles
            .iter()
            .filter(|t| q == "all" || t.title.to_lowercase().contains(&q))
            .map(|t| SearchHit {
                id: t.id.parse().unwrap(),
                kind: t.kind,
                name: t.title.clone(),
                year: t.year,
                rating: t.rating,
                vote_count: 100,
                genre_ids: vec![],
            })
            .collect())
    }

    async fn popular(&self, kind: MediaKind) -> Result<Vec<SearchHit>, UpstreamError> {
        if kind == MediaKind::Series {
            return Ok(vec![]);
        }
        self.search_multi("all").await
    }

    async fn trending(&self, kind: MediaKind) -> Result<Vec<SearchHit>, UpstreamError> {
        self.popular(kind).await
    }

    async fn fetch_details(
        &self,
        id: i32,
        _kind: MediaKind,
        _region: &str,
    ) -> Result<Title, UpstreamError> {
        self.titles
            .iter()
            .find(|t| t.id == id.to_string())
            .cloned()
            .ok_or(UpstreamError::Status {
                service: "tmdb",
                status: 404,
                body: String::new(),
            })
    }
}

#[derive(Default)]
struct FakeStreaming {
    shows: Vec<StreamingShow>,
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl StreamingApi for FakeStreaming {
    async fn search_by_title(
        &self,
        _title: &str,
        _country: &str,
    ) -> Result<Vec<StreamingShow>, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.shows.clone())
    }

    async fn show_details(
        &self,
        _kind: MediaKind,
        _id: &str,
    ) -> Result<StreamingShow, UpstreamError> {
        Err(unavailable("streaming-availability"))
    }
}

fn netflix_show(name: &str, country: &str) -> StreamingShow {
    let mut platforms = BTreeMap::new();
    platforms.insert(
        "netflix".to_string(),
        vec![StreamingOffer {
            link: Some(format!("https://www.netflix.com/title/{}", name.to_lowercase())),
            video_quality: Some("uhd".to_string()),
            audios: vec![],
        }],
    );
    let mut info: StreamingInfo = BTreeMap::new();
    info.insert(country.to_string(), platforms);
    StreamingShow {
        id: format!("{}-show", name.to_lowercase()),
        title: name.to_string(),
        kind: MediaKind::Movie,
        year: Some(2021),
        streaming_info: Some(info),
    }
}

fn location(country: &str, region: Option<&str>) -> Location {
    Location {
        country: country.to_string(),
        region: region.map(str::to_string),
        region_preference: region.and_then(|r| region_preference(country, r)),
    }
}

fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "TMDB_API_KEY" | "RAPIDAPI_KEY" => Some("test".to_string()),
        _ => None,
    })
    .unwrap()
}

async fn app_with(tmdb: FakeTmdb, streaming: Arc<FakeStreaming>, loc: Location) -> Router {
    let watchlist = Watchlist::open(Box::new(MemoryStore::default()))
        .await
        .unwrap();
    let state = AppState::new(
        Arc::new(tmdb),
        streaming,
        Arc::new(GeoContext::fixed(loc)),
        Arc::new(watchlist),
        &test_config(),
    );
    build_router(state)
}

async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn ids(body: &Value) -> Vec<String> {
    body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn health_is_ok() {
    let app = app_with(
        FakeTmdb { titles: vec![], fail: false },
        Arc::new(FakeStreaming::default()),
        location("US", None),
    )
    .await;
    let req = Request::get("/health").body(Body::empty()).unwrap();
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn search_attaches_streaming_platforms() {
    let app = app_with(
        FakeTmdb {
            titles: vec![title(438631, "Dune", &["English"], 8.0)],
            fail: false,
        },
        Arc::new(FakeStreaming {
            shows: vec![netflix_show("Dune", "us")],
            ..Default::default()
        }),
        location("US", None),
    )
    .await;

    let (status, body) = send(&app, "GET", "/titles?q=Dune").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["query"], "Dune");
    let first = &body["results"][0];
    assert_eq!(first["title"], "Dune");
    assert_eq!(first["type"], "movie");
    assert_eq!(first["platforms"][0]["name"], "Netflix");
    assert_eq!(
        first["platforms"][0]["streamingLink"],
        "https://www.netflix.com/title/dune"
    );
    assert_eq!(first["regions"], serde_json::json!(["US"]));
    assert!(body.get("message").is_none());
}

#[tokio::test]
async fn regional_language_titles_come_first() {
    let app = app_with(
        FakeTmdb {
            titles: vec![
                title(1, "Vikram Hindi", &["Hindi"], 7.0),
                title(2, "Vikram Tamil", &["Tamil"], 7.0),
                title(3, "Vikram Dub", &["தமிழ்"], 7.0),
            ],
            fail: false,
        },
        Arc::new(FakeStreaming::default()),
        location("IN", Some("Tamil Nadu")),
    )
    .await;

    let (status, body) = send(&app, "GET", "/titles?q=vikram").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec!["2", "3", "1"]);
    assert_eq!(body["regionPreference"]["displayName"], "Tamil Nadu, India");
}

#[tokio::test]
async fn min_rating_filter_applies_after_search() {
    let app = app_with(
        FakeTmdb {
            titles: vec![
                title(10, "Star Low", &["English"], 7.8),
                title(11, "Star High", &["English"], 9.5),
            ],
            fail: false,
        },
        Arc::new(FakeStreaming::default()),
        location("US", None),
    )
    .await;

    let (_, body) = send(&app, "GET", "/titles?q=star&min_rating=8").await;
    assert_eq!(ids(&body), vec!["11"]);

    let (_, body) = send(&app, "GET", "/titles?q=star&genres=Drama,Comedy").await;
    assert!(ids(&body).is_empty());
}

#[tokio::test]
async fn empty_search_carries_a_message() {
    let app = app_with(
        FakeTmdb {
            titles: vec![title(1, "Dune", &["English"], 8.0)],
            fail: false,
        },
        Arc::new(FakeStreaming::default()),
        location("US", None),
    )
    .await;

    let (status, body) = send(&app, "GET", "/titles?q=zzzz").await;
    assert_eq!(status, StatusCode::OK);
    assert!(ids(&body).is_empty());
    assert_eq!(
        body["message"],
        "No results found. Try a different search term."
    );
}

#[tokio::test]
async fn metadata_outage_is_a_retryable_bad_gateway() {
    let streaming = Arc::new(FakeStreaming::default());
    let app = app_with(
        FakeTmdb {
            titles: vec![],
            fail: true,
        },
        streaming,
        location("US", None),
    )
    .await;

    let (status, body) = send(&app, "GET", "/titles?q=Dune").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["retryable"], true);
}

#[tokio::test]
async fn blank_query_browses_popular_titles() {
    let streaming = Arc::new(FakeStreaming::default());
    let app = app_with(
        FakeTmdb {
            titles: vec![title(1, "Dune", &["English"], 8.0)],
            fail: false,
        },
        streaming.clone(),
        location("US", None),
    )
    .await;

    let (status, body) = send(&app, "GET", "/titles?q=%20%20").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec!["1"]);
    assert_eq!(streaming.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn trending_flags_titles() {
    let app = app_with(
        FakeTmdb {
            titles: vec![title(1, "Dune", &["English"], 8.0)],
            fail: false,
        },
        Arc::new(FakeStreaming::default()),
        location("US", None),
    )
    .await;

    let (status, body) = send(&app, "GET", "/trending").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["trending"], true);
}

#[tokio::test]
async fn title_detail_and_unknown_kind() {
    let app = app_with(
        FakeTmdb {
            titles: vec![title(438631, "Dune", &["English"], 8.0)],
            fail: false,
        },
        Arc::new(FakeStreaming::default()),
        location("US", None),
    )
    .await;

    let (status, body) = send(&app, "GET", "/titles/movie/438631").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Dune");

    let (status, _) = send(&app, "GET", "/titles/podcast/438631").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "GET", "/titles/movie/1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn location_reports_region_preference() {
    let app = app_with(
        FakeTmdb { titles: vec![], fail: false },
        Arc::new(FakeStreaming::default()),
        location("IN", Some("Kerala")),
    )
    .await;

    let (status, body) = send(&app, "GET", "/location").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["country"], "IN");
    assert_eq!(body["region"], "Kerala");
    assert_eq!(body["regionPreference"]["languages"][0], "Malayalam");
    assert_eq!(
        body["preferredLanguages"],
        serde_json::json!(["Malayalam", "English"])
    );
}

#[tokio::test]
async fn watchlist_add_is_idempotent_and_remove_works() {
    let app = app_with(
        FakeTmdb { titles: vec![], fail: false },
        Arc::new(FakeStreaming::default()),
        location("US", None),
    )
    .await;

    let (status, body) = send(&app, "PUT", "/watchlist/438631").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["movieId"], "438631");
    send(&app, "PUT", "/watchlist/438631").await;

    let (_, body) = send(&app, "GET", "/watchlist").await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["items"][0]["movieId"], "438631");

    let (status, _) = send(&app, "DELETE", "/watchlist/438631").await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "DELETE", "/watchlist/438631").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&app, "GET", "/watchlist").await;
    assert_eq!(body["count"], 0);
}
