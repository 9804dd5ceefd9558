use std::sync::Arc;
use thiserror::Error;

/// Any non-success response or transport failure from an external API.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("{service} request failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("{service} response could not be parsed: {source}")]
    Decode {
        service: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl UpstreamError {
    pub fn service(&self) -> &'static str {
        match self {
            UpstreamError::Transport { service, .. }
            | UpstreamError::Status { service, .. }
            | UpstreamError::Decode { service, .. } => service,
        }
    }
}

/// One title's enrichment attempt failed. Never escalates past the batch.
#[derive(Debug, Error)]
#[error("enrichment failed for title {title_id}: {source}")]
pub struct EnrichmentError {
    pub title_id: String,
    #[source]
    pub source: UpstreamError,
}

/// One search hit could not be turned into a full title.
#[derive(Debug, Error)]
#[error("hydration failed for {kind} {id}: {source}")]
pub struct HydrationError {
    pub kind: &'static str,
    pub id: i32,
    #[source]
    pub source: UpstreamError,
}

/// Failure surfaced to the user: the metadata path failed and nothing else is left.
///
/// The inner error is shared because every caller waiting on the same cached query
/// receives the same failure.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("metadata search unavailable: {0}")]
    Upstream(#[source] Arc<UpstreamError>),
}
