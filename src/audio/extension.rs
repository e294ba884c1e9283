//! Handling of trailing audio extension markers.

use std::path::{Path, PathBuf};
use tracing::debug;

/// Extensions the transcode backend may leave behind, compared case-insensitively.
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "webm", "opus", "ogg", "wav", "flac", "aac", "part"];

fn known_extension(file_name: &str) -> Option<(&str, &str)> {
    let (rest, ext) = file_name.rsplit_once('.')?;
    if rest.is_empty() {
        return None;
    }
    AUDIO_EXTENSIONS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(ext))
        .then_some((rest, ext))
}

/// Splits a file name into its bare stem and the last audio extension, if any.
fn split_markers(file_name: &str) -> (&str, Option<&str>) {
    let mut stem = file_name;
    let mut last_ext = None;
    while let Some((rest, ext)) = known_extension(stem) {
        if last_ext.is_none() {
            last_ext = Some(ext);
        }
        stem = rest;
    }
    (stem, last_ext)
}

/// Removes every trailing audio extension marker from `path`.
///
/// `Song.mp3.mp3` and `Song.webm.part` both become `Song`; dots that are not
/// followed by a known extension (`Mr. Brightside`) are kept.
pub fn strip_extensions(path: &Path) -> PathBuf {
    let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
        return path.to_path_buf();
    };
    let (stem, _) = split_markers(file_name);
    path.with_file_name(stem)
}

/// Collapses repeated trailing extension markers into exactly one.
///
/// The last marker wins (`x.webm.mp3` becomes `x.mp3`). When the name changes
/// the file is renamed in place; the returned path is where the file now is.
pub async fn normalize_extension(path: &Path) -> std::io::Result<PathBuf> {
    let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
        return Ok(path.to_path_buf());
    };
    let (stem, ext) = split_markers(file_name);
    let Some(ext) = ext else {
        return Ok(path.to_path_buf());
    };

    let normalized = path.with_file_name(format!("{}.{}", stem, ext.to_lowercase()));
    if normalized != path {
        debug!("Renaming {:?} to {:?}", path, normalized);
        tokio::fs::rename(path, &normalized).await?;
    }
    Ok(normalized)
}
