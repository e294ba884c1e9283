//! Parsing of user-supplied Spotify references.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref OPEN_URL: Regex = Regex::new(
        r"^https?://open\.spotify\.com/(?:intl-[A-Za-z-]+/)?(playlist|track)/([A-Za-z0-9]+)"
    )
    .unwrap();
    static ref URI: Regex = Regex::new(r"^spotify:(playlist|track):([A-Za-z0-9]+)$").unwrap();
}

/// What the user asked the grabber to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpotifyReference {
    Playlist(String),
    Track(String),
    /// Free text, resolved through the search endpoint.
    Query(String),
}

impl SpotifyReference {
    /// Parses a playlist or track URL / URI. Anything else is a free-text query.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        let captures = OPEN_URL.captures(input).or_else(|| URI.captures(input));
        match captures {
            Some(caps) => {
                let id = caps[2].to_string();
                match &caps[1] {
                    "playlist" => SpotifyReference::Playlist(id),
                    _ => SpotifyReference::Track(id),
                }
            }
            None => SpotifyReference::Query(input.to_string()),
        }
    }
}
