//! Filesystem-safe names for tracks, playlists and artwork.
//!
//! Everything that ends up as a path segment goes through [`sanitize`]:
//! characters other than word characters, whitespace and `-` are dropped,
//! whitespace runs collapse to a single space and the result is trimmed.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref FORBIDDEN_CHARS: Regex = Regex::new(r"[^\w\s-]").unwrap();
    static ref WHITESPACE_RUNS: Regex = Regex::new(r"\s+").unwrap();
}

/// Strips `text` down to word characters, single spaces and hyphens.
///
/// The result may be empty when `text` has nothing but forbidden characters,
/// callers that need a usable segment should go through [`path_segment`].
pub fn sanitize(text: &str) -> String {
    let stripped = FORBIDDEN_CHARS.replace_all(text, "");
    WHITESPACE_RUNS
        .replace_all(&stripped, " ")
        .trim()
        .to_string()
}

/// Like [`sanitize`], but never returns an empty string.
///
/// `fallback` is sanitized too, and if that is also empty the literal
/// `untitled` is used.
pub fn path_segment(text: &str, fallback: &str) -> String {
    let sanitized = sanitize(text);
    if !sanitized.is_empty() {
        return sanitized;
    }
    let fallback = sanitize(fallback);
    if fallback.is_empty() {
        "untitled".to_string()
    } else {
        fallback
    }
}

/// Underscore-joined variant used for artwork directories and files.
pub fn underscored(text: &str, fallback: &str) -> String {
    path_segment(text, fallback).replace(' ', "_")
}
