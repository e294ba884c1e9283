//! Sanity check for files produced by the transcode backend.

use lofty::prelude::*;
use lofty::probe::Probe;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Returns the playable duration of the audio file at `path`.
///
/// The container is detected from content, not from the extension, so a
/// mislabelled file is still judged by what it actually is.
pub fn probe_duration(path: &Path) -> Result<Duration, lofty::error::LoftyError> {
    let tagged_file = Probe::open(path)?.guess_file_type()?.read()?;
    Ok(tagged_file.properties().duration())
}

/// A file is valid when it parses as audio and has a strictly positive duration.
pub fn is_valid(path: &Path) -> bool {
    match probe_duration(path) {
        Ok(duration) if !duration.is_zero() => true,
        Ok(_) => {
            debug!("{:?} parsed but reports zero duration", path);
            false
        }
        Err(e) => {
            debug!("{:?} is not readable audio: {}", path, e);
            false
        }
    }
}
