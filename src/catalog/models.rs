use crate::metadata::TrackDescriptor;
use std::path::Path;

/// One row of the `tracks` table.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub spotify_id: String,
    pub title: String,
    pub artist: String,
    pub album_name: String,
    pub album_spotify_id: Option<String>,
    pub year: Option<String>,
    /// `m:ss`
    pub duration: String,
    /// Comma-joined genre list.
    pub genre: String,
    pub bpm: Option<f64>,
    pub energy: Option<f64>,
    pub file_path: String,
    pub album_art_path: Option<String>,
}

impl CatalogEntry {
    pub fn from_descriptor(
        track: &TrackDescriptor,
        file_path: &Path,
        album_art_path: Option<&Path>,
    ) -> Self {
        Self {
            spotify_id: track.id.clone(),
            title: track.title.clone(),
            artist: track.artist.clone(),
            album_name: track.album.clone(),
            album_spotify_id: track.album_id.clone(),
            year: track.year.clone(),
            duration: track.duration_string(),
            genre: track.genre_string(),
            bpm: track.features.map(|f| f.tempo),
            energy: track.features.map(|f| f.energy),
            file_path: file_path.to_string_lossy().to_string(),
            album_art_path: album_art_path.map(|p| p.to_string_lossy().to_string()),
        }
    }
}

/// What [`super::CatalogStore::record`] actually changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordOutcome {
    pub entry_inserted: bool,
    pub membership_linked: bool,
}
