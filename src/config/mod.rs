mod file_config;

pub use file_config::{FileConfig, RetryConfig, SpotifyConfig, YtDlpConfig};

use anyhow::{anyhow, Result};
use std::path::PathBuf;
use tracing::warn;

pub const DEFAULT_OUTPUT_DIR: &str = "Downloaded_Music";
pub const DEFAULT_CATALOG_DB: &str = "dj_music_library.db";
pub const DEFAULT_MAX_CANDIDATES: usize = 5;
pub const DEFAULT_BITRATE_KBPS: u32 = 192;
pub const MIN_WORKERS: usize = 1;
pub const MAX_WORKERS: usize = 64;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub output_dir: Option<PathBuf>,
    pub catalog_db: Option<PathBuf>,
    /// Raw user input, validated during resolution.
    pub workers: Option<String>,
    pub no_progress: bool,
    pub no_artwork: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub output_dir: PathBuf,
    pub catalog_db: PathBuf,
    pub workers: usize,
    pub show_progress: bool,
    pub fetch_artwork: bool,
    pub max_candidates: usize,
    pub audio_bitrate_kbps: u32,

    // Collaborators
    pub spotify: SpotifySettings,
    pub ytdlp: YtDlpSettings,
    pub retry: RetrySettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Self {
        Self::resolve_with_env(cli, file_config, |key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::resolve`] with an explicit environment lookup.
    pub fn resolve_with_env<F>(cli: &CliConfig, file_config: Option<FileConfig>, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = file_config.unwrap_or_default();

        // TOML overrides CLI for each field
        let output_dir = file
            .output_dir
            .map(PathBuf::from)
            .or_else(|| cli.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

        let catalog_db = file
            .catalog_db
            .map(PathBuf::from)
            .or_else(|| cli.catalog_db.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CATALOG_DB));

        let raw_workers = file
            .workers
            .map(|w| w.to_string())
            .or_else(|| cli.workers.clone());
        let workers = resolve_workers(raw_workers.as_deref());

        let show_progress = file.show_progress.unwrap_or(!cli.no_progress);
        let fetch_artwork = file.fetch_artwork.unwrap_or(!cli.no_artwork);

        let max_candidates = match file.max_candidates {
            Some(0) => {
                warn!(
                    "max_candidates must be at least 1, using {}",
                    DEFAULT_MAX_CANDIDATES
                );
                DEFAULT_MAX_CANDIDATES
            }
            Some(n) => n,
            None => DEFAULT_MAX_CANDIDATES,
        };
        let audio_bitrate_kbps = file.audio_bitrate_kbps.unwrap_or(DEFAULT_BITRATE_KBPS);

        // Spotify settings - credentials fall back to the environment
        let sp_file = file.spotify.unwrap_or_default();
        let client_id = sp_file
            .client_id
            .or_else(|| env("SPOTIFY_CLIENT_ID"))
            .or_else(|| env("SPOTIPY_CLIENT_ID"));
        let client_secret = sp_file
            .client_secret
            .or_else(|| env("SPOTIFY_CLIENT_SECRET"))
            .or_else(|| env("SPOTIPY_CLIENT_SECRET"));
        let sp_defaults = SpotifySettings::default();
        let spotify = SpotifySettings {
            client_id,
            client_secret,
            api_base_url: sp_file.api_base_url.unwrap_or(sp_defaults.api_base_url),
            auth_url: sp_file.auth_url.unwrap_or(sp_defaults.auth_url),
            timeout_sec: sp_file.timeout_sec.unwrap_or(sp_defaults.timeout_sec),
            enrich_genres: sp_file.enrich_genres.unwrap_or(sp_defaults.enrich_genres),
        };

        let yt_file = file.ytdlp.unwrap_or_default();
        let yt_defaults = YtDlpSettings::default();
        let ytdlp = YtDlpSettings {
            binary: yt_file.binary.unwrap_or(yt_defaults.binary),
            search_prefix: yt_file.search_prefix.unwrap_or(yt_defaults.search_prefix),
        };

        let retry_file = file.retry.unwrap_or_default();
        let retry_defaults = RetrySettings::default();
        let retry = RetrySettings {
            max_retries: retry_file.max_retries.unwrap_or(retry_defaults.max_retries),
            initial_backoff_ms: retry_file
                .initial_backoff_ms
                .unwrap_or(retry_defaults.initial_backoff_ms),
            max_backoff_ms: retry_file
                .max_backoff_ms
                .unwrap_or(retry_defaults.max_backoff_ms),
            backoff_multiplier: retry_file
                .backoff_multiplier
                .unwrap_or(retry_defaults.backoff_multiplier),
        };

        Self {
            output_dir,
            catalog_db,
            workers,
            show_progress,
            fetch_artwork,
            max_candidates,
            audio_bitrate_kbps,
            spotify,
            ytdlp,
            retry,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpotifySettings {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub api_base_url: String,
    pub auth_url: String,
    pub timeout_sec: u64,
    pub enrich_genres: bool,
}

impl SpotifySettings {
    /// Client id and secret, or an error naming where to put them.
    pub fn credentials(&self) -> Result<(String, String)> {
        match (&self.client_id, &self.client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Ok((id.clone(), secret.clone()))
            }
            _ => Err(anyhow!(
                "Spotify credentials missing: set SPOTIFY_CLIENT_ID and SPOTIFY_CLIENT_SECRET \
                 or the [spotify] section of the config file"
            )),
        }
    }
}

impl Default for SpotifySettings {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            api_base_url: "https://api.spotify.com/v1".to_string(),
            auth_url: "https://accounts.spotify.com/api/token".to_string(),
            timeout_sec: 30,
            enrich_genres: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct YtDlpSettings {
    pub binary: String,
    pub search_prefix: String,
}

impl Default for YtDlpSettings {
    fn default() -> Self {
        Self {
            binary: "yt-dlp".to_string(),
            search_prefix: "ytsearch".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff_ms: 2_000,
            max_backoff_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

/// `min(10, 2 × available parallelism)`.
pub fn default_workers() -> usize {
    (num_cpus::get() * 2).clamp(MIN_WORKERS, 10)
}

/// Parses a user-supplied worker count.
///
/// Anything that is not an integer in `MIN_WORKERS..=MAX_WORKERS` falls back
/// to [`default_workers`] with a warning.
pub fn resolve_workers(raw: Option<&str>) -> usize {
    let default = default_workers();
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return default;
    };
    match raw.parse::<usize>() {
        Ok(n) if (MIN_WORKERS..=MAX_WORKERS).contains(&n) => n,
        Ok(n) => {
            warn!(
                "Worker count {} outside {}..={}, using {}",
                n, MIN_WORKERS, MAX_WORKERS, default
            );
            default
        }
        Err(_) => {
            warn!("Invalid worker count '{}', using {}", raw, default);
            default
        }
    }
}
