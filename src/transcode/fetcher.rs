//! Retrying wrapper around a [`TranscodeBackend`].

use super::{RetryPolicy, TranscodeBackend, TranscodeError};
use crate::audio::strip_extensions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Produces one audio file for a source locator.
///
/// Pre-existing extension markers are stripped from the stem before every
/// attempt, so a retry never yields `Song.mp3.mp3`.
pub struct Fetcher {
    backend: Arc<dyn TranscodeBackend>,
    retry_policy: RetryPolicy,
}

impl Fetcher {
    pub fn new(backend: Arc<dyn TranscodeBackend>, retry_policy: RetryPolicy) -> Self {
        Self {
            backend,
            retry_policy,
        }
    }

    pub async fn fetch(
        &self,
        locator: &str,
        output_stem: &Path,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, TranscodeError> {
        let stem = strip_extensions(output_stem);
        let mut retry_count = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(TranscodeError::Cancelled);
            }

            let attempt = tokio::select! {
                _ = cancel.cancelled() => return Err(TranscodeError::Cancelled),
                result = self.backend.fetch(locator, &stem) => result,
            };

            let error = match attempt {
                Ok(path) if tokio::fs::try_exists(&path).await.unwrap_or(false) => {
                    debug!("Fetched {} to {:?}", locator, path);
                    return Ok(path);
                }
                Ok(path) => TranscodeError::MissingOutput(path),
                Err(e) => e,
            };

            if !self.retry_policy.should_retry(&error, retry_count) {
                return Err(error);
            }

            let backoff = self.retry_policy.backoff(retry_count);
            retry_count += 1;
            warn!(
                "Fetch of {} failed ({}), retry {}/{} in {:?}",
                locator, error, retry_count, self.retry_policy.max_retries, backoff
            );
            tokio::select! {
                _ = cancel.cancelled() => return Err(TranscodeError::Cancelled),
                _ = tokio::time::sleep(backoff) => {}
            }
        }
    }
}
