//! Shared constants for end-to-end tests
//!
//! Ids and names used by the fakes and the fake Spotify server.

// ============================================================================
// Playlist
// ============================================================================

pub const PLAYLIST_ID: &str = "37i9dQZF1DXcBWIGoYBM5M";
pub const PLAYLIST_NAME: &str = "Road Trip: 2000s!";
/// `PLAYLIST_NAME` after sanitization.
pub const PLAYLIST_DIR: &str = "Road Trip 2000s";

// ============================================================================
// Tracks served by the fake Spotify API
// ============================================================================

pub const TRACK_1_ID: &str = "3n3Ppam7vgaVa1iaRUc9Lp";
pub const TRACK_1_TITLE: &str = "Mr. Brightside";
pub const TRACK_1_ARTIST: &str = "The Killers";
pub const TRACK_1_ARTIST_ID: &str = "0C0XlULifJtAgn6ZNCW2eu";

pub const TRACK_2_ID: &str = "7ouMYWpwJ422jRcDASZB7P";
pub const TRACK_2_TITLE: &str = "Seven Nation Army";
pub const TRACK_2_ARTIST: &str = "The White Stripes";
pub const TRACK_2_ARTIST_ID: &str = "4F84IBURUo98rz4r61KF70";

pub const TRACK_3_ID: &str = "2takcwOaAZWiXQijPHIx7B";
pub const TRACK_3_TITLE: &str = "Time to Pretend";
pub const TRACK_3_ARTIST: &str = "MGMT";
pub const TRACK_3_ARTIST_ID: &str = "0SwO7SWeDHJijQ3XNS7xEE";

pub const UNKNOWN_TRACK_ID: &str = "0000000000000000000000";

// ============================================================================
// Credentials accepted by the fake token endpoint
// ============================================================================

pub const CLIENT_ID: &str = "test-client";
pub const CLIENT_SECRET: &str = "test-secret";
