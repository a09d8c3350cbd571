//! Error types for the harvest pipeline.

/// Errors surfaced by the crawl and download stages.
///
/// Only [`HarvestError::HubUnreachable`] is fatal to a run; every other
/// variant is reported per entity and never aborts sibling work.
#[derive(thiserror::Error, Debug)]
pub enum HarvestError {
    #[error("hub page {url} unreachable: {reason}")]
    HubUnreachable { url: String, reason: String },

    #[error("invalid selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("invalid URL `{0}`")]
    InvalidUrl(String),

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("gave up on {url} after {attempts} attempts: {reason}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure of a single page fetch inside a crawl stage.
#[derive(thiserror::Error, Debug, Clone)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("host not allowed: {0}")]
    Disallowed(String),
}

pub type Result<T> = std::result::Result<T, HarvestError>;
