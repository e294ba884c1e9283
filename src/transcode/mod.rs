//! Fetching remote sources and transcoding them to local audio files.

mod fetcher;
mod retry_policy;
mod ytdlp;

pub use fetcher::Fetcher;
pub use retry_policy::RetryPolicy;
pub use ytdlp::YtDlpTranscoder;
pub(crate) use ytdlp::classify_failure;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while fetching and transcoding a source.
#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("Transcode backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Unsupported source: {0}")]
    Unsupported(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limited by source: {0}")]
    RateLimited(String),

    #[error("Backend failed: {0}")]
    Failed(String),

    #[error("Backend reported {0:?} but no such file exists")]
    MissingOutput(PathBuf),

    #[error("Cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TranscodeError {
    /// Whether another attempt has a chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TranscodeError::Network(_) | TranscodeError::Failed(_))
    }

    /// Quota and bot-check failures affect every track, not just this one.
    pub fn is_batch_fatal(&self) -> bool {
        matches!(self, TranscodeError::RateLimited(_))
    }
}

/// An external download-and-transcode tool.
///
/// Implementations receive an extension-free output stem and must return the
/// definitive path of the single file they produced.
#[async_trait]
pub trait TranscodeBackend: Send + Sync {
    async fn fetch(&self, locator: &str, output_stem: &Path) -> Result<PathBuf, TranscodeError>;
}
