//! Bounded fan-out of a batch of tracks over the track pipeline.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::track::{BatchTarget, TrackError, TrackOutcome, TrackPipeline};
use crate::metadata::TrackDescriptor;

/// Per-outcome counters for one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub downloaded: usize,
    pub already_present: usize,
    pub no_match: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn completed(&self) -> usize {
        self.downloaded + self.already_present + self.no_match + self.failed
    }

    fn count(&mut self, result: &Result<TrackOutcome, TrackError>) {
        match result {
            Ok(TrackOutcome::Downloaded { .. }) => self.downloaded += 1,
            Ok(TrackOutcome::AlreadyPresent(_)) => self.already_present += 1,
            Ok(TrackOutcome::NoMatch) => self.no_match += 1,
            Err(_) => self.failed += 1,
        }
    }
}

impl std::fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} downloaded, {} already present, {} without match, {} failed",
            self.downloaded, self.already_present, self.no_match, self.failed
        )
    }
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Batch aborted at {track}: {source}")]
    Aborted {
        track: String,
        #[source]
        source: TrackError,
        summary: BatchSummary,
    },

    #[error("Batch cancelled after {} tracks", .summary.completed())]
    Cancelled { summary: BatchSummary },
}

impl BatchError {
    pub fn summary(&self) -> &BatchSummary {
        match self {
            BatchError::Aborted { summary, .. } | BatchError::Cancelled { summary } => summary,
        }
    }
}

/// Runs up to `worker_count` track pipelines at once.
///
/// A per-track failure is counted and logged; a batch-fatal one cancels
/// `cancel`, aborts the in-flight workers and ends the run.
pub struct BatchScheduler {
    pipeline: Arc<TrackPipeline>,
    worker_count: usize,
    show_progress: bool,
}

impl BatchScheduler {
    pub fn new(pipeline: Arc<TrackPipeline>, worker_count: usize, show_progress: bool) -> Self {
        Self {
            pipeline,
            worker_count: worker_count.max(1),
            show_progress,
        }
    }

    pub async fn run(
        &self,
        tracks: Vec<TrackDescriptor>,
        target: Arc<BatchTarget>,
        cancel: CancellationToken,
    ) -> Result<BatchSummary, BatchError> {
        let progress = self.progress_bar(tracks.len() as u64);
        let mut summary = BatchSummary::default();
        let mut pending = tracks.into_iter();
        let mut workers: JoinSet<(TrackDescriptor, Result<TrackOutcome, TrackError>)> =
            JoinSet::new();

        info!(
            "Processing {} tracks with {} workers",
            pending.len(),
            self.worker_count
        );

        loop {
            while workers.len() < self.worker_count && !cancel.is_cancelled() {
                let Some(track) = pending.next() else {
                    break;
                };
                let pipeline = self.pipeline.clone();
                let target = target.clone();
                let cancel = cancel.clone();
                workers.spawn(async move {
                    let result = pipeline.process(&track, &target, &cancel).await;
                    (track, result)
                });
            }

            let joined = tokio::select! {
                joined = workers.join_next() => joined,
                _ = cancel.cancelled() => None,
            };

            let Some(joined) = joined else {
                break;
            };

            progress.inc(1);
            let (track, result) = match joined {
                Ok(pair) => pair,
                Err(e) => {
                    error!("Track worker crashed: {}", e);
                    summary.failed += 1;
                    continue;
                }
            };

            summary.count(&result);
            if let Err(e) = result {
                if e.is_batch_fatal() {
                    error!(
                        "Aborting batch: {} failed with {}",
                        track.display_name(),
                        e
                    );
                    cancel.cancel();
                    workers.abort_all();
                    progress.abandon();
                    return Err(BatchError::Aborted {
                        track: track.display_name(),
                        source: e,
                        summary,
                    });
                }
                warn!("Failed {}: {}", track.display_name(), e);
            }
        }

        if cancel.is_cancelled() {
            workers.abort_all();
            progress.abandon();
            warn!("Batch cancelled: {}", summary);
            return Err(BatchError::Cancelled { summary });
        }

        progress.finish();
        info!("Batch finished: {}", summary);
        Ok(summary)
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        let progress = ProgressBar::new(len);
        if !self.show_progress {
            progress.set_draw_target(ProgressDrawTarget::hidden());
            return progress;
        }
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        {
            progress.set_style(style.progress_chars("=> "));
        }
        progress
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let mut summary = BatchSummary::default();
        summary.count(&Ok(TrackOutcome::NoMatch));
        summary.count(&Ok(TrackOutcome::AlreadyPresent("a.mp3".into())));
        summary.count(&Ok(TrackOutcome::Downloaded {
            path: "b.mp3".into(),
            source_url: "https://www.youtube.com/watch?v=b".to_string(),
        }));
        summary.count(&Err(TrackError::InvalidOutput("c.mp3".into())));

        assert_eq!(
            summary,
            BatchSummary {
                downloaded: 1,
                already_present: 1,
                no_match: 1,
                failed: 1,
            }
        );
        assert_eq!(summary.completed(), 4);
        assert_eq!(
            summary.to_string(),
            "1 downloaded, 1 already present, 1 without match, 1 failed"
        );
    }
}
