use crate::catalog::Catalog;
use crate::config::Config;
use crate::enhance::SearchService;
use crate::error::{SearchError, UpstreamError};
use crate::geo::{preferred_languages, GeoContext};
use crate::models::{FilterState, MediaKind, Title};
use crate::ranking::{prioritize_region, rank_and_filter};
use crate::streaming::{StreamingApi, StreamingClient};
use crate::tmdb::{TmdbApi, TmdbClient};
use crate::watchlist::{JsonFileStore, Watchlist};
use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

const MAX_BODY_BYTES: usize = 64 * 1024;
const NO_RESULTS_MESSAGE: &str = "No results found. Try a different search term.";

#[derive(Clone)]
pub struct AppState {
    pub search: Arc<SearchService>,
    pub catalog: Arc<Catalog>,
    pub geo: Arc<GeoContext>,
    pub watchlist: Arc<Watchlist>,
}

impl AppState {
    /// Wires every service around one shared location context.
    pub fn new(
        tmdb: Arc<dyn TmdbApi>,
        streaming: Arc<dyn StreamingApi>,
        geo: Arc<GeoContext>,
        watchlist: Arc<Watchlist>,
        config: &Config,
    ) -> Self {
        Self {
            search: Arc::new(SearchService::new(
                tmdb.clone(),
                streaming,
                geo.clone(),
                config.search_freshness,
            )),
            catalog: Arc::new(Catalog::new(tmdb, geo.clone(), config.catalog_freshness)),
            geo,
            watchlist,
        }
    }
}

pub async fn run_server(config: Config) -> Result<()> {
    let tmdb: Arc<dyn TmdbApi> = Arc::new(TmdbClient::new(
        config.tmdb_api_key.clone(),
        config.upstream_timeout,
    )?);
    let streaming: Arc<dyn StreamingApi> = Arc::new(StreamingClient::new(
        config.rapidapi_key.clone(),
        config.upstream_timeout,
    )?);
    let geo = Arc::new(GeoContext::from_http(
        &config.default_country,
        config.upstream_timeout,
    )?);
    let watchlist = Arc::new(
        Watchlist::open(Box::new(JsonFileStore::new(&config.watchlist_path))).await?,
    );
    info!("Watchlist stored at {}", config.watchlist_path.display());

    let state = AppState::new(tmdb, streaming, geo, watchlist, &config);
    let app = build_router(state);

    info!("Listening on {}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/titles", get(list_titles))
        .route("/titles/:kind/:id", get(title_detail))
        .route("/trending", get(trending))
        .route("/location", get(location))
        .route("/watchlist", get(watchlist_items))
        .route("/watchlist/:id", put(watchlist_add).delete(watchlist_remove))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Error body rendered by every failing handler.
#[derive(Debug)]
pub enum ApiError {
    Upstream(Arc<UpstreamError>),
    NotFound(String),
    Internal(anyhow::Error),
}

impl From<SearchError> for ApiError {
    fn from(e: SearchError) -> Self {
        match e {
            SearchError::Upstream(inner) => ApiError::Upstream(inner),
        }
    }
}

impl From<Arc<UpstreamError>> for ApiError {
    fn from(e: Arc<UpstreamError>) -> Self {
        ApiError::Upstream(e)
    }
}

impl From<UpstreamError> for ApiError {
    fn from(e: UpstreamError) -> Self {
        ApiError::Upstream(Arc::new(e))
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Internal(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Upstream(e) if matches!(e.as_ref(), UpstreamError::Status { status: 404, .. }) => (
                StatusCode::NOT_FOUND,
                json!({"error": "Title not found", "retryable": false}),
            ),
            ApiError::Upstream(e) => {
                error!(service = e.service(), "Upstream failure: {}", e);
                (
                    StatusCode::BAD_GATEWAY,
                    json!({
                        "error": format!("{} is unavailable, please try again", e.service()),
                        "retryable": true,
                    }),
                )
            }
            ApiError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                json!({"error": what, "retryable": false}),
            ),
            ApiError::Internal(e) => {
                error!("Internal error: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"error": "Internal error", "retryable": false}),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

async fn health() -> &'static str {
    "OK"
}

#[derive(Debug, Default, Deserialize)]
pub struct TitlesQuery {
    q: Option<String>,
    genres: Option<String>,
    languages: Option<String>,
    platforms: Option<String>,
    min_rating: Option<f32>,
}

impl TitlesQuery {
    fn filters(&self) -> FilterState {
        FilterState {
            genres: split_facet(self.genres.as_deref()),
            languages: split_facet(self.languages.as_deref()),
            platforms: split_facet(self.platforms.as_deref()),
            min_rating: self.min_rating.unwrap_or(0.0),
        }
    }
}

fn split_facet(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

async fn list_titles(
    State(state): State<AppState>,
    Query(params): Query<TitlesQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let query = params.q.as_deref().unwrap_or("").trim().to_string();
    let titles = if query.is_empty() {
        state.catalog.popular().await?
    } else {
        state.search.search(&query).await?
    };

    let preference = state.geo.location().await.region_preference.clone();
    let filters = params.filters();
    let results = rank_and_filter(titles, preference.as_ref(), &filters);
    info!(
        query = %query,
        results = results.len(),
        "Titles listed"
    );

    let mut body = json!({
        "query": query,
        "results": results,
        "regionPreference": preference,
    });
    if results.is_empty() && !query.is_empty() {
        body["message"] = json!(NO_RESULTS_MESSAGE);
    }
    Ok(Json(body))
}

async fn trending(State(state): State<AppState>) -> Result<Json<Vec<Title>>, ApiError> {
    let titles = state.catalog.trending().await?;
    let preference = state.geo.location().await.region_preference.as_ref();
    Ok(Json(prioritize_region(titles, preference)))
}

async fn title_detail(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, i32)>,
) -> Result<Json<Title>, ApiError> {
    let kind: MediaKind = kind.parse().map_err(|_| {
        warn!("Unknown title kind requested: {}", kind);
        ApiError::NotFound(format!("Unknown title kind: {}", kind))
    })?;
    Ok(Json(state.catalog.details(kind, id).await?))
}

async fn location(State(state): State<AppState>) -> Json<serde_json::Value> {
    let location = state.geo.location().await;
    let mut body = json!(location);
    body["preferredLanguages"] = json!(preferred_languages(
        &location.country,
        location.region.as_deref()
    ));
    Json(body)
}

async fn watchlist_items(State(state): State<AppState>) -> Json<serde_json::Value> {
    let items = state.watchlist.items().await;
    Json(json!({ "count": items.len(), "items": items }))
}

async fn watchlist_add(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<crate::models::WatchlistItem>, ApiError> {
    let item = state.watchlist.add(&id).await?;
    info!("Added {} to watchlist", id);
    Ok(Json(item))
}

async fn watchlist_remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.watchlist.remove(&id).await? {
        info!("Removed {} from watchlist", id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("{} is not on the watchlist", id)))
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facets_split_on_commas_and_skip_blanks() {
        assert_eq!(
            split_facet(Some("Drama, Action,,")),
            vec!["Drama".to_string(), "Action".to_string()]
        );
        assert!(split_facet(None).is_empty());
    }

    #[test]
    fn upstream_errors_render_as_retryable_bad_gateway() {
        let err = ApiError::from(UpstreamError::Status {
            service: "tmdb",
            status: 503,
            body: String::new(),
        });
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn upstream_not_found_is_404() {
        let err = ApiError::from(UpstreamError::Status {
            service: "tmdb",
            status: 404,
            body: String::new(),
        });
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }
}
