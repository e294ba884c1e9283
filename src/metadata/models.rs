//! Track descriptors and the Spotify Web API payloads they are built from.

use serde::Deserialize;
use std::time::Duration;

/// Tempo and energy as reported by the audio-features endpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioFeatures {
    pub tempo: f64,
    pub energy: f64,
}

/// Metadata for one song, as delivered by the metadata provider.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackDescriptor {
    /// Stable source-catalog identifier (Spotify base62 id).
    pub id: String,
    pub title: String,
    /// Primary (first listed) artist.
    pub artist: String,
    /// Spotify id of the primary artist, used for genre enrichment.
    pub artist_id: Option<String>,
    pub album: String,
    pub album_id: Option<String>,
    /// Release year, taken from the first four characters of the album release date.
    pub year: Option<String>,
    pub genres: Vec<String>,
    pub duration: Duration,
    /// Largest album image, if any.
    pub album_art_url: Option<String>,
    pub features: Option<AudioFeatures>,
}

impl TrackDescriptor {
    /// Comma-joined genre list as stored in the catalog and written to tags.
    pub fn genre_string(&self) -> String {
        self.genres.join(", ")
    }

    /// Duration formatted as `m:ss`.
    pub fn duration_string(&self) -> String {
        let total_secs = self.duration.as_secs();
        format!("{}:{:02}", total_secs / 60, total_secs % 60)
    }

    /// The text query handed to the search provider.
    pub fn search_query(&self) -> String {
        format!("{} {} official audio", self.title, self.artist)
    }

    /// `Artist - Title` display form, also the base of the output filename.
    pub fn display_name(&self) -> String {
        format!("{} - {}", self.artist, self.title)
    }
}

// =============================================================================
// Spotify Web API payloads
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_lifetime")]
    pub expires_in: u64,
}

fn default_token_lifetime() -> u64 {
    3600
}

#[derive(Debug, Deserialize)]
pub struct PlaylistInfo {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct Paging<T> {
    pub items: Vec<T>,
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistItem {
    pub track: Option<SpotifyTrack>,
    #[serde(default)]
    pub is_local: bool,
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub tracks: Paging<SpotifyTrack>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyArtist {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ArtistsResponse {
    pub artists: Vec<Option<SpotifyArtist>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyImage {
    pub url: String,
    pub width: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyAlbum {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub images: Vec<SpotifyImage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyTrack {
    /// Missing for local files in playlists.
    pub id: Option<String>,
    pub name: String,
    pub artists: Vec<SpotifyArtist>,
    pub album: SpotifyAlbum,
    pub duration_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct AudioFeaturesResponse {
    pub tempo: f64,
    pub energy: f64,
}

impl SpotifyTrack {
    /// Converts the wire representation into a descriptor.
    ///
    /// Returns `None` for items that cannot be processed (no id or no artist).
    pub fn into_descriptor(self) -> Option<TrackDescriptor> {
        let id = self.id?;
        let primary_artist = self.artists.into_iter().next()?;

        let year = self
            .album
            .release_date
            .as_deref()
            .and_then(|date| date.get(..4))
            .map(str::to_string);

        // Spotify lists images widest first, but don't rely on it.
        let album_art_url = self
            .album
            .images
            .iter()
            .max_by_key(|image| image.width.unwrap_or(0))
            .map(|image| image.url.clone());

        Some(TrackDescriptor {
            id,
            title: self.name,
            artist: primary_artist.name,
            artist_id: primary_artist.id,
            album: self.album.name,
            album_id: self.album.id,
            year,
            genres: primary_artist.genres,
            duration: Duration::from_millis(self.duration_ms),
            album_art_url,
            features: None,
        })
    }
}
