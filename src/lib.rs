//! Pezzottify Grabber Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod artwork;
pub mod audio;
pub mod catalog;
pub mod config;
pub mod metadata;
pub mod pipeline;
pub mod sanitize;
pub mod search;
pub mod session;
pub mod sqlite_persistence;
pub mod transcode;

// Re-export commonly used types for convenience
pub use catalog::{CatalogStore, SqliteCatalogStore};
pub use metadata::{MetadataProvider, SpotifyReference, TrackDescriptor};
pub use session::{run_with_config, Session, SessionError, SessionReport};
