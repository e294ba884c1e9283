use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub output_dir: Option<String>,
    pub catalog_db: Option<String>,
    pub workers: Option<i64>,
    pub show_progress: Option<bool>,
    pub fetch_artwork: Option<bool>,
    pub max_candidates: Option<usize>,
    pub audio_bitrate_kbps: Option<u32>,

    // Collaborator configs
    pub spotify: Option<SpotifyConfig>,
    pub ytdlp: Option<YtDlpConfig>,
    pub retry: Option<RetryConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub api_base_url: Option<String>,
    pub auth_url: Option<String>,
    pub timeout_sec: Option<u64>,
    /// Fill genres from the primary artist (one extra request per 50 tracks).
    pub enrich_genres: Option<bool>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct YtDlpConfig {
    pub binary: Option<String>,
    /// Search extractor prefix, e.g. "ytsearch" or "ytmsearch".
    pub search_prefix: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: Option<u32>,
    pub initial_backoff_ms: Option<u64>,
    pub max_backoff_ms: Option<u64>,
    pub backoff_multiplier: Option<f64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
