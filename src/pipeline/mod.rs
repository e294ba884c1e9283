//! Track acquisition: the per-track pipeline and the batch scheduler around it.

mod manifest;
mod scheduler;
mod track;

pub use manifest::{ManifestWriter, MANIFEST_FILE_NAME, MANIFEST_HEADER};
pub use scheduler::{BatchError, BatchScheduler, BatchSummary};
pub use track::{BatchTarget, TrackError, TrackOutcome, TrackPipeline, OUTPUT_EXTENSION};
