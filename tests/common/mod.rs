//! Common test infrastructure
//!
//! This module provides all the infrastructure needed for end-to-end tests.
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{test_config, numbered_tracks, FakeMetadataProvider, FakeSearch, FakeTranscoder};
//!
//! #[tokio::test]
//! async fn test_playlist() {
//!     let dir = tempfile::TempDir::new().unwrap();
//!     let metadata = FakeMetadataProvider::playlist("Mix", numbered_tracks(3));
//!     // build a Session with the fakes and run it
//! }
//! ```

#![allow(dead_code)]

mod constants;
mod fakes;
mod fixtures;
mod spotify_server;

// Public API - this is what tests import
pub use constants::*;
pub use fakes::{
    locator_for, query_for, FakeMetadataProvider, FakeSearch, FakeTranscoder, FetchBehavior,
};
pub use fixtures::{numbered_tracks, test_config, track, wav_bytes};
pub use spotify_server::{FakeSpotifyServer, COVER_BYTES};
