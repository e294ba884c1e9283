//! Writes descriptive tags into produced audio files.

use lofty::config::WriteOptions;
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::Tag;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum TagError {
    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: lofty::error::LoftyError,
    },

    #[error("No writable tag for {0:?}")]
    NoWritableTag(PathBuf),

    #[error("Failed to write tags to {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: lofty::error::LoftyError,
    },
}

/// Values written by [`tag_file`]. Optional fields are skipped when empty.
#[derive(Debug, Clone, Default)]
pub struct TrackTags<'a> {
    pub artist: &'a str,
    pub title: &'a str,
    pub album: Option<&'a str>,
    pub genre: Option<&'a str>,
    pub year: Option<&'a str>,
}

/// Writes `tags` into the file at `path`, creating a tag block if none exists.
///
/// Re-tagging replaces previous values, it never adds duplicate frames.
pub fn tag_file(path: &Path, tags: &TrackTags<'_>) -> Result<(), TagError> {
    let read_err = |source| TagError::Read {
        path: path.to_path_buf(),
        source,
    };
    let mut tagged_file = Probe::open(path)
        .map_err(read_err)?
        .guess_file_type()
        .map_err(|e| TagError::Read {
            path: path.to_path_buf(),
            source: e.into(),
        })?
        .read()
        .map_err(read_err)?;

    let tag_type = tagged_file.primary_tag_type();
    if tagged_file.tag(tag_type).is_none() {
        debug!("Creating {:?} tag for {:?}", tag_type, path);
        tagged_file.insert_tag(Tag::new(tag_type));
    }
    let tag = tagged_file
        .tag_mut(tag_type)
        .ok_or_else(|| TagError::NoWritableTag(path.to_path_buf()))?;

    tag.insert_text(ItemKey::TrackArtist, tags.artist.to_string());
    tag.insert_text(ItemKey::TrackTitle, tags.title.to_string());

    let optional = [
        (ItemKey::AlbumTitle, tags.album),
        (ItemKey::Genre, tags.genre),
        (ItemKey::RecordingDate, tags.year),
    ];
    for (key, value) in optional {
        if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
            tag.insert_text(key, value.to_string());
        }
    }

    tagged_file
        .save_to_path(path, WriteOptions::default())
        .map_err(|source| TagError::Write {
            path: path.to_path_buf(),
            source,
        })
}
