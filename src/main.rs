use anyhow::{Context, Result};
use clap::Parser;
use std::{fmt::Debug, path::PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pezzottify_grabber::config::{AppConfig, CliConfig, FileConfig};
use pezzottify_grabber::session::{cancel_on_ctrl_c, run_with_config, SessionReport};
use pezzottify_grabber::SpotifyReference;

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[clap(about = "Download Spotify playlists and tracks as tagged MP3 files")]
struct CliArgs {
    /// Spotify playlist or track URL / URI, or a free-text track query.
    pub reference: String,

    /// Path to a TOML config file. Its values override the flags below.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Number of tracks processed concurrently (1-64). Invalid values fall back to the default.
    #[clap(short, long)]
    pub workers: Option<String>,

    /// Root directory for playlist folders, singles and album art.
    #[clap(long, value_parser = parse_path)]
    pub output_dir: Option<PathBuf>,

    /// Path to the SQLite catalog database file.
    #[clap(long, value_parser = parse_path)]
    pub catalog_db: Option<PathBuf>,

    /// Do not draw a progress bar.
    #[clap(long)]
    pub no_progress: bool,

    /// Do not download album covers.
    #[clap(long)]
    pub no_artwork: bool,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            output_dir: self.output_dir.clone(),
            catalog_db: self.catalog_db.clone(),
            workers: self.workers.clone(),
            no_progress: self.no_progress,
            no_artwork: self.no_artwork,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config);
    info!(
        "Output to {:?}, catalog {:?}, {} workers",
        config.output_dir, config.catalog_db, config.workers
    );

    let reference = SpotifyReference::parse(&cli_args.reference);
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    match run_with_config(config, &reference, cancel).await {
        Ok(SessionReport::Playlist {
            name,
            output_dir,
            summary,
        }) => {
            info!("Playlist '{}' done ({}), files in {:?}", name, summary, output_dir);
            Ok(())
        }
        Ok(SessionReport::Single {
            output_dir,
            summary,
        }) => {
            info!("Single track done ({}), files in {:?}", summary, output_dir);
            Ok(())
        }
        Ok(SessionReport::NotFound) => {
            info!("Nothing to download for '{}'", cli_args.reference);
            Ok(())
        }
        Err(e) => {
            error!("{}", e);
            Err(e.into())
        }
    }
}
