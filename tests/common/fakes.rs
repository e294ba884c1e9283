//! In-process fakes for the metadata, search and transcode collaborators.
//!
//! Every fake counts its calls so tests can assert that a run did (or did
//! not) touch the network.

use async_trait::async_trait;
use pezzottify_grabber::metadata::ProviderError;
use pezzottify_grabber::search::{SearchError, SearchHit, SearchProvider};
use pezzottify_grabber::transcode::{TranscodeBackend, TranscodeError};
use pezzottify_grabber::{MetadataProvider, SpotifyReference, TrackDescriptor};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::fixtures::wav_bytes;

// ============================================================================
// Metadata provider
// ============================================================================

pub struct FakeMetadataProvider {
    pub playlist_name: String,
    pub tracks: Vec<TrackDescriptor>,
    /// Returned by `lookup` for any reference.
    pub single: Option<TrackDescriptor>,
    /// When set, every call fails with a fresh error from this constructor.
    pub failure: Option<fn() -> ProviderError>,
    pub calls: AtomicUsize,
}

impl FakeMetadataProvider {
    pub fn playlist(name: &str, tracks: Vec<TrackDescriptor>) -> Self {
        Self {
            playlist_name: name.to_string(),
            tracks,
            single: None,
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn single(track: Option<TrackDescriptor>) -> Self {
        Self {
            playlist_name: String::new(),
            tracks: Vec::new(),
            single: track,
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(failure: fn() -> ProviderError) -> Self {
        Self {
            failure: Some(failure),
            ..Self::playlist("", Vec::new())
        }
    }

    fn check(&self) -> Result<(), ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.failure {
            Some(failure) => Err(failure()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MetadataProvider for FakeMetadataProvider {
    async fn lookup(
        &self,
        _reference: &SpotifyReference,
    ) -> Result<Option<TrackDescriptor>, ProviderError> {
        self.check()?;
        Ok(self.single.clone())
    }

    async fn list_playlist_tracks(
        &self,
        _playlist_id: &str,
    ) -> Result<Vec<TrackDescriptor>, ProviderError> {
        self.check()?;
        Ok(self.tracks.clone())
    }

    async fn playlist_name(&self, _playlist_id: &str) -> Result<String, ProviderError> {
        self.check()?;
        Ok(self.playlist_name.clone())
    }
}

// ============================================================================
// Search provider
// ============================================================================

/// Deterministic watch URL for a query, so tests can predict locators.
pub fn locator_for(query: &str) -> String {
    format!(
        "https://www.youtube.com/watch?v={}",
        query.replace(' ', "_").to_lowercase()
    )
}

/// The query the pipeline sends for `artist` / `title`.
pub fn query_for(artist: &str, title: &str) -> String {
    format!("{} {} official audio", title, artist)
}

/// Returns one acceptable hit per query unless told otherwise.
#[derive(Default)]
pub struct FakeSearch {
    overrides: HashMap<String, Vec<SearchHit>>,
    rate_limited: HashSet<String>,
    pub calls: AtomicUsize,
}

impl FakeSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hits(mut self, query: &str, hits: Vec<SearchHit>) -> Self {
        self.overrides.insert(query.to_string(), hits);
        self
    }

    pub fn rate_limited_on(mut self, query: &str) -> Self {
        self.rate_limited.insert(query.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchProvider for FakeSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.rate_limited.contains(query) {
            return Err(SearchError::RateLimited(
                "Sign in to confirm you're not a bot".to_string(),
            ));
        }
        let hits = match self.overrides.get(query) {
            Some(hits) => hits.clone(),
            None => vec![SearchHit {
                title: query.trim_end_matches(" official audio").to_string(),
                duration_secs: Some(222),
                locator: locator_for(query),
            }],
        };
        Ok(hits.into_iter().take(max_results).collect())
    }
}

// ============================================================================
// Transcode backend
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchBehavior {
    /// Fail with `Unsupported` (never retried).
    Unsupported,
    /// Fail with `Network` this many times, then succeed.
    FlakyNetwork(usize),
    RateLimited,
    /// Write a zero-byte file.
    EmptyFile,
    /// Write `<stem>.mp3.mp3`.
    DoubleExtension,
    /// Write `<stem>.mp3.mp3` and put a directory at `<stem>.mp3`, so the
    /// extension cannot be normalized.
    BlockedRename,
}

/// Writes a short WAV to `<stem>.mp3` for every locator.
pub struct FakeTranscoder {
    behaviors: HashMap<String, FetchBehavior>,
    attempts: Mutex<HashMap<String, usize>>,
    delay: Duration,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub calls: AtomicUsize,
}

impl FakeTranscoder {
    pub fn new() -> Self {
        Self {
            behaviors: HashMap::new(),
            attempts: Mutex::new(HashMap::new()),
            delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_behavior(mut self, locator: &str, behavior: FetchBehavior) -> Self {
        self.behaviors.insert(locator.to_string(), behavior);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn produce(&self, locator: &str, output_stem: &Path) -> Result<PathBuf, TranscodeError> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let entry = attempts.entry(locator.to_string()).or_insert(0);
            *entry += 1;
            *entry
        };

        let mut file_name = output_stem.file_name().unwrap().to_os_string();
        let payload = match self.behaviors.get(locator) {
            None => wav_bytes(1500),
            Some(FetchBehavior::Unsupported) => {
                return Err(TranscodeError::Unsupported(locator.to_string()))
            }
            Some(FetchBehavior::RateLimited) => {
                return Err(TranscodeError::RateLimited("HTTP Error 429".to_string()))
            }
            Some(FetchBehavior::FlakyNetwork(failures)) if attempt <= *failures => {
                return Err(TranscodeError::Network("connection reset".to_string()))
            }
            Some(FetchBehavior::FlakyNetwork(_)) => wav_bytes(1500),
            Some(FetchBehavior::EmptyFile) => Vec::new(),
            Some(FetchBehavior::DoubleExtension) => {
                file_name.push(".mp3");
                wav_bytes(1500)
            }
            Some(FetchBehavior::BlockedRename) => {
                let mut blocker = file_name.clone();
                blocker.push(".mp3");
                std::fs::create_dir_all(output_stem.with_file_name(blocker))?;
                file_name.push(".mp3");
                wav_bytes(1500)
            }
        };
        file_name.push(".mp3");

        let path = output_stem.with_file_name(file_name);
        std::fs::write(&path, payload)?;
        Ok(path)
    }
}

#[async_trait]
impl TranscodeBackend for FakeTranscoder {
    async fn fetch(&self, locator: &str, output_stem: &Path) -> Result<PathBuf, TranscodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let result = self.produce(locator, output_stem);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
