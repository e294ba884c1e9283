//! One grabber run: resolve the reference, prepare the output directory and
//! drive the batch scheduler.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::artwork::ArtworkFetcher;
use crate::catalog::{CatalogStore, SqliteCatalogStore};
use crate::config::AppConfig;
use crate::metadata::{MetadataProvider, ProviderError, SpotifyClient, SpotifyReference};
use crate::pipeline::{
    BatchError, BatchScheduler, BatchSummary, BatchTarget, ManifestWriter, TrackPipeline,
    MANIFEST_FILE_NAME,
};
use crate::sanitize::path_segment;
use crate::search::{CandidateMatcher, SearchProvider, YtDlpSearch};
use crate::transcode::{Fetcher, RetryPolicy, TranscodeBackend, YtDlpTranscoder};

/// Directory under the output root that receives single-track downloads.
pub const SINGLES_DIR: &str = "Singles";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Metadata provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error(transparent)]
    Setup(#[from] anyhow::Error),
}

/// What a completed run did.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionReport {
    Playlist {
        name: String,
        output_dir: PathBuf,
        summary: BatchSummary,
    },
    Single {
        output_dir: PathBuf,
        summary: BatchSummary,
    },
    /// The track reference or query resolved to nothing.
    NotFound,
}

pub struct Session {
    config: AppConfig,
    metadata: Arc<dyn MetadataProvider>,
    catalog: Arc<dyn CatalogStore>,
    scheduler: BatchScheduler,
}

impl Session {
    pub fn new(
        config: AppConfig,
        metadata: Arc<dyn MetadataProvider>,
        search: Arc<dyn SearchProvider>,
        backend: Arc<dyn TranscodeBackend>,
        catalog: Arc<dyn CatalogStore>,
    ) -> Result<Self> {
        let artwork = if config.fetch_artwork {
            Some(ArtworkFetcher::new(
                &config.output_dir,
                config.spotify.timeout_sec,
            )?)
        } else {
            None
        };

        let pipeline = TrackPipeline::new(
            CandidateMatcher::new(search),
            Fetcher::new(backend, RetryPolicy::new(&config.retry)),
            catalog.clone(),
            artwork,
            config.max_candidates,
        );
        let scheduler =
            BatchScheduler::new(Arc::new(pipeline), config.workers, config.show_progress);

        Ok(Self {
            config,
            metadata,
            catalog,
            scheduler,
        })
    }

    pub async fn run(
        &self,
        reference: &SpotifyReference,
        cancel: CancellationToken,
    ) -> Result<SessionReport, SessionError> {
        let report = match reference {
            SpotifyReference::Playlist(id) => self.run_playlist(id, cancel).await?,
            _ => self.run_single(reference, cancel).await?,
        };

        match self.catalog.track_count() {
            Ok(count) => info!("Catalog now holds {} tracks", count),
            Err(e) => warn!("Failed to count catalog tracks: {:#}", e),
        }
        Ok(report)
    }

    async fn run_playlist(
        &self,
        playlist_id: &str,
        cancel: CancellationToken,
    ) -> Result<SessionReport, SessionError> {
        let name = self.metadata.playlist_name(playlist_id).await?;
        let output_dir = self.config.output_dir.join(path_segment(
            &name,
            &format!("playlist-{}", playlist_id),
        ));
        tokio::fs::create_dir_all(&output_dir)
            .await
            .with_context(|| format!("Failed to create {:?}", output_dir))?;
        info!("Playlist '{}' -> {:?}", name, output_dir);

        let manifest = ManifestWriter::create(&output_dir.join(MANIFEST_FILE_NAME))?;
        info!("Writing tracklist to {:?}", manifest.path());
        let tracks = self.metadata.list_playlist_tracks(playlist_id).await?;
        info!("Found {} tracks in '{}'", tracks.len(), name);

        let target = Arc::new(BatchTarget::new(
            output_dir.clone(),
            Some(playlist_id.to_string()),
            Some(manifest),
        ));
        let summary = self.scheduler.run(tracks, target, cancel).await?;

        Ok(SessionReport::Playlist {
            name,
            output_dir,
            summary,
        })
    }

    async fn run_single(
        &self,
        reference: &SpotifyReference,
        cancel: CancellationToken,
    ) -> Result<SessionReport, SessionError> {
        let Some(track) = self.metadata.lookup(reference).await? else {
            info!("No track found for {:?}", reference);
            return Ok(SessionReport::NotFound);
        };
        info!("Found {}", track.display_name());

        let output_dir = self.config.output_dir.join(SINGLES_DIR);
        tokio::fs::create_dir_all(&output_dir)
            .await
            .with_context(|| format!("Failed to create {:?}", output_dir))?;

        let target = Arc::new(BatchTarget::new(output_dir.clone(), None, None));
        let summary = self.scheduler.run(vec![track], target, cancel).await?;

        Ok(SessionReport::Single {
            output_dir,
            summary,
        })
    }
}

/// Builds the production collaborators (Spotify, yt-dlp, SQLite) and runs once.
pub async fn run_with_config(
    config: AppConfig,
    reference: &SpotifyReference,
    cancel: CancellationToken,
) -> Result<SessionReport, SessionError> {
    let transcoder = YtDlpTranscoder::new(&config.ytdlp.binary, config.audio_bitrate_kbps);
    let version = transcoder
        .check_available()
        .await
        .context("yt-dlp is required")?;
    info!("Using {} {}", config.ytdlp.binary, version);

    let metadata = SpotifyClient::new(&config.spotify)?;
    let search = YtDlpSearch::new(&config.ytdlp.binary, &config.ytdlp.search_prefix);

    info!("Opening catalog database at {:?}...", config.catalog_db);
    let catalog = SqliteCatalogStore::open(&config.catalog_db)?;

    let session = Session::new(
        config,
        Arc::new(metadata),
        Arc::new(search),
        Arc::new(transcoder),
        Arc::new(catalog),
    )?;
    session.run(reference, cancel).await
}

/// Cancels `cancel` on the first Ctrl-C.
pub fn cancel_on_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => {
                    warn!("Interrupted, cancelling the batch");
                    cancel.cancel();
                }
                Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
            },
            _ = cancel.cancelled() => {}
        }
    });
}
