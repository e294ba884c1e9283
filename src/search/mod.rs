//! Remote video search and candidate selection.

mod matcher;
mod ytdlp_search;

pub use matcher::{CandidateMatcher, BANNED_KEYWORDS, MAX_DURATION_SECS, MIN_DURATION_SECS};
pub use ytdlp_search::YtDlpSearch;

use async_trait::async_trait;
use thiserror::Error;

/// One raw result as returned by a search provider.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub title: String,
    /// Duration in seconds, if the provider reports one.
    pub duration_secs: Option<u64>,
    /// Something the transcode backend can fetch (usually a watch URL).
    pub locator: String,
}

/// A search result that passed every rejection rule.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoCandidate {
    pub title: String,
    pub duration_secs: u64,
    pub locator: String,
}

/// Errors that can occur when talking to a search provider.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search backend unavailable: {0}")]
    Unavailable(String),

    #[error("Search failed: {0}")]
    Failed(String),

    #[error("Rate limited by search provider: {0}")]
    RateLimited(String),

    #[error("Invalid search output: {0}")]
    InvalidOutput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SearchError {
    /// Quota and bot-check failures affect every track, not just this one.
    pub fn is_batch_fatal(&self) -> bool {
        matches!(self, SearchError::RateLimited(_))
    }
}

/// Trait for video search backends.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Returns up to `max_results` hits, most relevant first.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError>;
}
