//! Single-track pipeline: dedupe, match, fetch, validate, normalize, tag, record.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::manifest::ManifestWriter;
use crate::artwork::ArtworkFetcher;
use crate::audio::{self, TagError, TrackTags};
use crate::catalog::{CatalogEntry, CatalogStore};
use crate::metadata::TrackDescriptor;
use crate::sanitize::{path_segment, sanitize};
use crate::search::{CandidateMatcher, SearchError};
use crate::transcode::{Fetcher, TranscodeError};

/// Extension of every file the pipeline produces.
pub const OUTPUT_EXTENSION: &str = "mp3";

/// How a track left the pipeline without an error.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackOutcome {
    Downloaded { path: PathBuf, source_url: String },
    /// The expected output file already existed; nothing was fetched.
    AlreadyPresent(PathBuf),
    /// Every search result was rejected, or there were none.
    NoMatch,
}

#[derive(Debug, Error)]
pub enum TrackError {
    #[error("Search failed: {0}")]
    Search(#[from] SearchError),

    #[error("Fetch failed: {0}")]
    Transcode(#[from] TranscodeError),

    #[error("Produced file {0:?} is not valid audio")]
    InvalidOutput(PathBuf),

    #[error("Failed to normalize extension: {0}")]
    Normalize(#[source] std::io::Error),

    #[error("Tagging failed: {0}")]
    Tag(#[from] TagError),

    #[error("Failed to write manifest row: {0:#}")]
    Manifest(anyhow::Error),

    #[error("Blocking task failed: {0}")]
    Blocking(#[from] JoinError),
}

impl TrackError {
    /// Whether this failure should stop the whole batch rather than just this track.
    pub fn is_batch_fatal(&self) -> bool {
        match self {
            TrackError::Search(e) => e.is_batch_fatal(),
            TrackError::Transcode(e) => e.is_batch_fatal(),
            _ => false,
        }
    }
}

/// Where a batch writes its files and what it records them under.
pub struct BatchTarget {
    pub output_dir: PathBuf,
    /// Playlist memberships are linked under this id; `None` for single tracks.
    pub playlist_id: Option<String>,
    pub manifest: Option<ManifestWriter>,
    /// Output paths already taken by a track of this batch.
    claimed: Mutex<HashSet<PathBuf>>,
}

impl BatchTarget {
    pub fn new(
        output_dir: PathBuf,
        playlist_id: Option<String>,
        manifest: Option<ManifestWriter>,
    ) -> Self {
        Self {
            output_dir,
            playlist_id,
            manifest,
            claimed: Mutex::new(HashSet::new()),
        }
    }

    /// `<output_dir>/<Artist - Title>.mp3`, with a `track-<id>` fallback.
    pub fn expected_path(&self, track: &TrackDescriptor) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", output_file_stem(track), OUTPUT_EXTENSION))
    }

    /// Returns false if another track of this batch already took `path`.
    fn claim(&self, path: &Path) -> bool {
        let mut claimed = match self.claimed.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        claimed.insert(path.to_path_buf())
    }
}

fn output_file_stem(track: &TrackDescriptor) -> String {
    let artist = sanitize(&track.artist);
    let title = sanitize(&track.title);
    match (artist.is_empty(), title.is_empty()) {
        (false, false) => format!("{} - {}", artist, title),
        (false, true) => artist,
        (true, false) => title,
        (true, true) => path_segment("", &format!("track-{}", track.id)),
    }
}

pub struct TrackPipeline {
    matcher: CandidateMatcher,
    fetcher: Fetcher,
    catalog: Arc<dyn CatalogStore>,
    artwork: Option<ArtworkFetcher>,
    max_candidates: usize,
}

impl TrackPipeline {
    pub fn new(
        matcher: CandidateMatcher,
        fetcher: Fetcher,
        catalog: Arc<dyn CatalogStore>,
        artwork: Option<ArtworkFetcher>,
        max_candidates: usize,
    ) -> Self {
        Self {
            matcher,
            fetcher,
            catalog,
            artwork,
            max_candidates,
        }
    }

    pub async fn process(
        &self,
        track: &TrackDescriptor,
        target: &BatchTarget,
        cancel: &CancellationToken,
    ) -> Result<TrackOutcome, TrackError> {
        let expected = target.expected_path(track);

        if !target.claim(&expected) {
            info!(
                "Skipping {}: {:?} is already handled in this batch",
                track.display_name(),
                expected
            );
            return Ok(TrackOutcome::AlreadyPresent(expected));
        }

        if tokio::fs::try_exists(&expected).await.unwrap_or(false) {
            info!("Already present: {}", track.display_name());
            let art = self
                .artwork
                .as_ref()
                .map(|a| a.cover_path(&track.artist, &track.title))
                .filter(|p| p.exists());
            self.record(track, &expected, art.as_deref(), target).await;
            return Ok(TrackOutcome::AlreadyPresent(expected));
        }

        let Some(candidate) = self
            .matcher
            .find(&track.search_query(), self.max_candidates)
            .await?
        else {
            info!("No acceptable match for {}", track.display_name());
            return Ok(TrackOutcome::NoMatch);
        };
        debug!(
            "Matched {} to '{}' ({}s)",
            track.display_name(),
            candidate.title,
            candidate.duration_secs
        );

        let mut produced = self
            .fetcher
            .fetch(&candidate.locator, &expected, cancel)
            .await?;

        let art = match self
            .finish(track, target, &candidate.locator, &mut produced)
            .await
        {
            Ok(art) => art,
            Err(e) => {
                if let Err(remove_err) = tokio::fs::remove_file(&produced).await {
                    warn!("Failed to delete {:?}: {}", produced, remove_err);
                }
                return Err(e);
            }
        };

        self.record(track, &produced, art.as_deref(), target).await;

        info!("Downloaded {} -> {:?}", track.display_name(), produced);
        Ok(TrackOutcome::Downloaded {
            path: produced,
            source_url: candidate.locator,
        })
    }

    /// Validates, normalizes and tags the fetched file, then writes its
    /// manifest row. `produced` always points at the file's current location.
    async fn finish(
        &self,
        track: &TrackDescriptor,
        target: &BatchTarget,
        locator: &str,
        produced: &mut PathBuf,
    ) -> Result<Option<PathBuf>, TrackError> {
        let probe_path = produced.clone();
        if !tokio::task::spawn_blocking(move || audio::is_valid(&probe_path)).await? {
            return Err(TrackError::InvalidOutput(produced.clone()));
        }

        let normalized = audio::normalize_extension(produced)
            .await
            .map_err(TrackError::Normalize)?;
        *produced = normalized;

        let tag_path = produced.clone();
        let tag_track = track.clone();
        tokio::task::spawn_blocking(move || {
            let genre = tag_track.genre_string();
            audio::tag_file(
                &tag_path,
                &TrackTags {
                    artist: &tag_track.artist,
                    title: &tag_track.title,
                    album: Some(tag_track.album.as_str()),
                    genre: Some(genre.as_str()),
                    year: tag_track.year.as_deref(),
                },
            )
        })
        .await??;

        let art = match &self.artwork {
            Some(artwork) => artwork.fetch(track).await,
            None => None,
        };

        if let Some(manifest) = &target.manifest {
            manifest
                .append(&track.artist, &track.title, locator)
                .map_err(TrackError::Manifest)?;
        }
        Ok(art)
    }

    /// Inserts the entry and links the playlist. Failures are logged, never returned.
    async fn record(
        &self,
        track: &TrackDescriptor,
        path: &Path,
        art: Option<&Path>,
        target: &BatchTarget,
    ) {
        let entry = CatalogEntry::from_descriptor(track, path, art);
        let playlist_id = target.playlist_id.clone();
        let catalog = self.catalog.clone();

        let result =
            tokio::task::spawn_blocking(move || catalog.record(&entry, playlist_id.as_deref()))
                .await;

        match result {
            Ok(Ok(outcome)) => debug!(
                "Catalog for {}: inserted={} linked={}",
                track.display_name(),
                outcome.entry_inserted,
                outcome.membership_linked
            ),
            Ok(Err(e)) => warn!(
                "Failed to record {} in catalog: {:#}",
                track.display_name(),
                e
            ),
            Err(e) => warn!(
                "Catalog task for {} failed: {}",
                track.display_name(),
                e
            ),
        }
    }
}
