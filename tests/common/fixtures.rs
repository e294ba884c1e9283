//! Test data builders
//!
//! Small WAV payloads stand in for transcoded audio: they are valid media
//! with a real duration, and the validator and tagger detect the container
//! from the content rather than the `.mp3` name.

use pezzottify_grabber::config::{AppConfig, CliConfig};
use pezzottify_grabber::TrackDescriptor;
use std::path::Path;
use std::time::Duration;

/// Silent 8 kHz mono 16-bit PCM WAV of the given length.
pub fn wav_bytes(millis: u32) -> Vec<u8> {
    let sample_rate = 8000u32;
    let byte_rate = sample_rate * 2;
    let data_len = byte_rate * millis / 1000;
    let mut out = Vec::with_capacity(44 + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVEfmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&1u16.to_le_bytes()); // mono
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    out.resize(44 + data_len as usize, 0);
    out
}

pub fn track(id: &str, artist: &str, title: &str) -> TrackDescriptor {
    TrackDescriptor {
        id: id.to_string(),
        title: title.to_string(),
        artist: artist.to_string(),
        artist_id: Some(format!("artist-{}", id)),
        album: format!("{} (Album)", title),
        album_id: Some(format!("album-{}", id)),
        year: Some("2004".to_string()),
        genres: vec!["indie rock".to_string(), "rock".to_string()],
        duration: Duration::from_secs(222),
        album_art_url: None,
        features: None,
    }
}

/// `count` distinct tracks, `Artist N - Song N`.
pub fn numbered_tracks(count: usize) -> Vec<TrackDescriptor> {
    (1..=count)
        .map(|n| {
            track(
                &format!("track{:02}", n),
                &format!("Artist {}", n),
                &format!("Song {}", n),
            )
        })
        .collect()
}

/// Config rooted in `root`, with no retries, no progress bar and no artwork.
pub fn test_config(root: &Path, workers: usize) -> AppConfig {
    let cli = CliConfig {
        output_dir: Some(root.join("music")),
        catalog_db: Some(root.join("catalog.db")),
        workers: Some(workers.to_string()),
        no_progress: true,
        no_artwork: true,
    };
    let mut config = AppConfig::resolve_with_env(&cli, None, |_| None);
    config.retry.max_retries = 0;
    config.retry.initial_backoff_ms = 1;
    config
}
