//! First-match candidate selection with keyword and duration rejection.
//!
//! The provider's ordering is treated as relevance: the matcher walks the
//! hits in order and returns the first one that is neither a banned variant
//! (live, remix, cover, ...) nor outside the plausible song-length window.

use super::{SearchError, SearchHit, SearchProvider, VideoCandidate};
use std::sync::Arc;
use tracing::debug;

/// Title fragments that mark a result as a non-studio variant.
pub const BANNED_KEYWORDS: &[&str] = &[
    "live",
    "remix",
    "cover",
    "performance",
    "music video",
    "sped up",
    "slowed",
    "reverb",
    "nightcore",
    "8d",
    "#shorts",
];

/// Inclusive lower bound for an acceptable duration.
pub const MIN_DURATION_SECS: u64 = 90;
/// Inclusive upper bound for an acceptable duration.
pub const MAX_DURATION_SECS: u64 = 600;

/// Picks a single playable candidate for a text query.
pub struct CandidateMatcher {
    provider: Arc<dyn SearchProvider>,
}

impl CandidateMatcher {
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self { provider }
    }

    /// Returns the first acceptable candidate among the top `max_candidates`
    /// hits, or `None` when every hit is rejected or there are none.
    pub async fn find(
        &self,
        query: &str,
        max_candidates: usize,
    ) -> Result<Option<VideoCandidate>, SearchError> {
        let hits = self.provider.search(query, max_candidates).await?;
        debug!("Search for '{}' returned {} hits", query, hits.len());

        Ok(hits
            .into_iter()
            .take(max_candidates)
            .find_map(|hit| accept(hit, query)))
    }
}

fn accept(hit: SearchHit, query: &str) -> Option<VideoCandidate> {
    if let Some(keyword) = banned_keyword(&hit.title) {
        debug!(
            "Rejecting '{}' for '{}': contains '{}'",
            hit.title, query, keyword
        );
        return None;
    }

    let duration_secs = match hit.duration_secs {
        Some(secs) if (MIN_DURATION_SECS..=MAX_DURATION_SECS).contains(&secs) => secs,
        other => {
            debug!(
                "Rejecting '{}' for '{}': duration {:?} outside {}..={}s",
                hit.title, query, other, MIN_DURATION_SECS, MAX_DURATION_SECS
            );
            return None;
        }
    };

    Some(VideoCandidate {
        title: hit.title,
        duration_secs,
        locator: hit.locator,
    })
}

/// Returns the first banned keyword found in `title`, case-insensitively.
pub(crate) fn banned_keyword(title: &str) -> Option<&'static str> {
    let lowered = title.to_lowercase();
    BANNED_KEYWORDS
        .iter()
        .copied()
        .find(|keyword| lowered.contains(keyword))
}
