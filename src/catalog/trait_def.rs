//! CatalogStore trait definition.

use super::models::{CatalogEntry, RecordOutcome};
use anyhow::Result;

/// Trait for catalog storage backends.
///
/// Implementations serialize their own writes, so a single store can be
/// shared by every worker of a batch.
pub trait CatalogStore: Send + Sync {
    /// Create or upgrade the schema. Safe to call more than once.
    fn init_schema(&self) -> Result<()>;

    /// Whether a track with this id is already catalogued.
    fn has(&self, spotify_id: &str) -> Result<bool>;

    /// Inserts `entry` unless its id is already present. Returns whether a row was added.
    fn insert(&self, entry: &CatalogEntry) -> Result<bool>;

    /// Adds the (track, playlist) membership unless present. Returns whether a row was added.
    fn link(&self, spotify_id: &str, playlist_id: &str) -> Result<bool>;

    /// Insert and link in one transaction.
    fn record(&self, entry: &CatalogEntry, playlist_id: Option<&str>) -> Result<RecordOutcome>;

    fn get_entry(&self, spotify_id: &str) -> Result<Option<CatalogEntry>>;

    fn track_count(&self) -> Result<usize>;

    /// Ids of every track linked to `playlist_id`, in insertion order.
    fn playlist_track_ids(&self, playlist_id: &str) -> Result<Vec<String>>;
}
