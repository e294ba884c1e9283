//! Track metadata lookups against the Spotify Web API.

mod models;
mod reference;
mod spotify;

pub use models::{AudioFeatures, TrackDescriptor};
pub use reference::SpotifyReference;
pub use spotify::SpotifyClient;

use async_trait::async_trait;
use thiserror::Error;

/// Errors returned by a metadata provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limited (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid reference: {0}")]
    InvalidReference(String),
}

impl ProviderError {
    /// Credential and quota problems hit every remaining track the same way.
    pub fn is_batch_fatal(&self) -> bool {
        matches!(
            self,
            ProviderError::Auth(_) | ProviderError::RateLimited { .. }
        )
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::InvalidResponse(err.to_string())
        } else {
            ProviderError::Http(err.to_string())
        }
    }
}

/// Source of track descriptors.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Resolves a track id or a free-text query to a single track.
    ///
    /// `Ok(None)` means nothing matched; it is not an error.
    async fn lookup(&self, reference: &SpotifyReference) -> Result<Option<TrackDescriptor>, ProviderError>;

    /// Every processable track in the playlist, following pagination to the end.
    async fn list_playlist_tracks(&self, playlist_id: &str) -> Result<Vec<TrackDescriptor>, ProviderError>;

    async fn playlist_name(&self, playlist_id: &str) -> Result<String, ProviderError>;
}
