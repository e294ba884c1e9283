//! HTTP client for the Spotify Web API (client-credentials flow).

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::models::{
    ArtistsResponse, AudioFeaturesResponse, Paging, PlaylistInfo, PlaylistItem, SearchResponse,
    SpotifyTrack, TokenResponse,
};
use super::{AudioFeatures, MetadataProvider, ProviderError, SpotifyReference, TrackDescriptor};
use crate::config::SpotifySettings;

const PLAYLIST_PAGE_SIZE: u32 = 100;
const ARTISTS_PER_REQUEST: usize = 50;

/// Tokens are refreshed this long before Spotify says they expire.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self, now: Instant) -> bool {
        now + TOKEN_REFRESH_MARGIN < self.expires_at
    }
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Metadata provider backed by the Spotify Web API.
pub struct SpotifyClient {
    client: reqwest::Client,
    api_base_url: String,
    auth_url: String,
    client_id: String,
    client_secret: String,
    enrich_genres: bool,
    token: Mutex<Option<CachedToken>>,
}

impl SpotifyClient {
    /// Creates a client from resolved settings. Fails if credentials are missing.
    pub fn new(settings: &SpotifySettings) -> Result<Self> {
        let (client_id, client_secret) = settings.credentials()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_sec))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            auth_url: settings.auth_url.clone(),
            client_id,
            client_secret,
            enrich_genres: settings.enrich_genres,
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String, ProviderError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Instant::now())) {
            return Ok(token.access_token.clone());
        }

        debug!("Requesting Spotify access token");
        let response = self
            .client
            .post(&self.auth_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    ProviderError::Auth(format!("token request rejected ({}): {}", status, body))
                }
                _ => status_error(status, None, body),
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("token response: {}", e)))?;

        let access_token = token.access_token.clone();
        *cached = Some(CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });
        Ok(access_token)
    }

    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    /// GETs `url` and decodes the body.
    ///
    /// A 401 drops the cached token and retries once with a fresh one.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ProviderError> {
        let mut refreshed = false;
        loop {
            let token = self.access_token().await?;
            let response = self.client.get(url).bearer_auth(&token).send().await?;

            if response.status() == StatusCode::UNAUTHORIZED && !refreshed {
                debug!("Access token rejected, refreshing");
                self.invalidate_token().await;
                refreshed = true;
                continue;
            }

            let response = error_for_status(response).await?;
            return response
                .json()
                .await
                .map_err(|e| ProviderError::InvalidResponse(format!("{}: {}", url, e)));
        }
    }

    async fn get_track(&self, id: &str) -> Result<Option<TrackDescriptor>, ProviderError> {
        let url = format!("{}/tracks/{}", self.api_base_url, urlencoding::encode(id));
        match self.get_json::<SpotifyTrack>(&url).await {
            Ok(track) => Ok(track.into_descriptor()),
            Err(ProviderError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn search_track(&self, query: &str) -> Result<Option<TrackDescriptor>, ProviderError> {
        let url = format!(
            "{}/search?q={}&type=track&limit=1",
            self.api_base_url,
            urlencoding::encode(query)
        );
        let response: SearchResponse = self.get_json(&url).await?;
        Ok(response
            .tracks
            .items
            .into_iter()
            .find_map(SpotifyTrack::into_descriptor))
    }

    /// Fills in genres from the primary artists, 50 ids per request.
    ///
    /// Only batch-fatal errors are returned; anything else leaves genres empty.
    async fn enrich_genres(&self, tracks: &mut [TrackDescriptor]) -> Result<(), ProviderError> {
        let mut seen = HashSet::new();
        let artist_ids: Vec<String> = tracks
            .iter()
            .filter(|t| t.genres.is_empty())
            .filter_map(|t| t.artist_id.clone())
            .filter(|id| seen.insert(id.clone()))
            .collect();

        let mut genres_by_artist: HashMap<String, Vec<String>> = HashMap::new();
        for chunk in artist_ids.chunks(ARTISTS_PER_REQUEST) {
            let url = format!("{}/artists?ids={}", self.api_base_url, chunk.join(","));
            match self.get_json::<ArtistsResponse>(&url).await {
                Ok(response) => {
                    for artist in response.artists.into_iter().flatten() {
                        if let Some(id) = artist.id {
                            genres_by_artist.insert(id, artist.genres);
                        }
                    }
                }
                Err(e) if e.is_batch_fatal() => return Err(e),
                Err(e) => warn!("Failed to fetch artist genres: {}", e),
            }
        }

        for track in tracks.iter_mut().filter(|t| t.genres.is_empty()) {
            if let Some(genres) = track
                .artist_id
                .as_ref()
                .and_then(|id| genres_by_artist.get(id))
            {
                track.genres = genres.clone();
            }
        }
        Ok(())
    }

    async fn audio_features(&self, track_id: &str) -> Option<AudioFeatures> {
        let url = format!(
            "{}/audio-features/{}",
            self.api_base_url,
            urlencoding::encode(track_id)
        );
        match self.get_json::<AudioFeaturesResponse>(&url).await {
            Ok(features) => Some(AudioFeatures {
                tempo: features.tempo,
                energy: features.energy,
            }),
            Err(e) => {
                debug!("No audio features for {}: {}", track_id, e);
                None
            }
        }
    }
}

#[async_trait]
impl MetadataProvider for SpotifyClient {
    async fn lookup(
        &self,
        reference: &SpotifyReference,
    ) -> Result<Option<TrackDescriptor>, ProviderError> {
        let track = match reference {
            SpotifyReference::Track(id) => self.get_track(id).await?,
            SpotifyReference::Query(text) => self.search_track(text).await?,
            SpotifyReference::Playlist(id) => {
                return Err(ProviderError::InvalidReference(format!(
                    "playlist {} is not a track",
                    id
                )))
            }
        };

        let Some(mut track) = track else {
            return Ok(None);
        };

        if self.enrich_genres {
            self.enrich_genres(std::slice::from_mut(&mut track)).await?;
        }
        track.features = self.audio_features(&track.id).await;
        Ok(Some(track))
    }

    async fn list_playlist_tracks(
        &self,
        playlist_id: &str,
    ) -> Result<Vec<TrackDescriptor>, ProviderError> {
        let mut next_url = Some(format!(
            "{}/playlists/{}/tracks?limit={}",
            self.api_base_url,
            urlencoding::encode(playlist_id),
            PLAYLIST_PAGE_SIZE
        ));

        let mut tracks = Vec::new();
        let mut skipped = 0usize;
        while let Some(url) = next_url.take() {
            let page: Paging<PlaylistItem> = self.get_json(&url).await?;
            for item in page.items {
                match item.track.filter(|_| !item.is_local) {
                    Some(track) => match track.into_descriptor() {
                        Some(descriptor) => tracks.push(descriptor),
                        None => skipped += 1,
                    },
                    None => skipped += 1,
                }
            }
            next_url = page.next;
        }

        if skipped > 0 {
            info!(
                "Skipped {} unavailable or local items in playlist {}",
                skipped, playlist_id
            );
        }

        if self.enrich_genres {
            self.enrich_genres(&mut tracks).await?;
        }
        Ok(tracks)
    }

    async fn playlist_name(&self, playlist_id: &str) -> Result<String, ProviderError> {
        let url = format!(
            "{}/playlists/{}?fields=name",
            self.api_base_url,
            urlencoding::encode(playlist_id)
        );
        let info: PlaylistInfo = self.get_json(&url).await?;
        Ok(info.name)
    }
}

async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after_secs = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok());
    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, retry_after_secs, body))
}

fn status_error(status: StatusCode, retry_after_secs: Option<u64>, body: String) -> ProviderError {
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .map(|b| b.error.message)
        .unwrap_or(body);

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Auth(message),
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited { retry_after_secs },
        StatusCode::NOT_FOUND => ProviderError::NotFound(message),
        _ => ProviderError::Api {
            status: status.as_u16(),
            message,
        },
    }
}
