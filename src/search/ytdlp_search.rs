//! Search provider backed by the `yt-dlp` command line tool.

use super::{SearchError, SearchHit, SearchProvider};
use crate::transcode::{classify_failure, TranscodeError};
use async_trait::async_trait;
use serde::Deserialize;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// One line of `yt-dlp --flat-playlist --dump-json` output.
#[derive(Debug, Deserialize)]
struct FlatEntry {
    id: Option<String>,
    title: Option<String>,
    duration: Option<f64>,
    webpage_url: Option<String>,
    url: Option<String>,
}

impl FlatEntry {
    fn locator(&self) -> Option<String> {
        if let Some(url) = self.webpage_url.as_ref().or(self.url.as_ref()) {
            return Some(url.clone());
        }
        self.id
            .as_ref()
            .map(|id| format!("https://www.youtube.com/watch?v={}", id))
    }
}

/// Runs `yt-dlp "<prefix><n>:<query>"` and parses the flat result list.
pub struct YtDlpSearch {
    binary: String,
    search_prefix: String,
}

impl YtDlpSearch {
    pub fn new(binary: impl Into<String>, search_prefix: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            search_prefix: search_prefix.into(),
        }
    }

    fn search_term(&self, query: &str, max_results: usize) -> String {
        format!("{}{}:{}", self.search_prefix, max_results, query)
    }
}

#[async_trait]
impl SearchProvider for YtDlpSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        let term = self.search_term(query, max_results.max(1));
        debug!("Running {} search: {}", self.binary, term);

        let output = Command::new(&self.binary)
            .args(["--flat-playlist", "--dump-json", "--no-warnings"])
            .arg(&term)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    SearchError::Unavailable(format!("{} not found in PATH", self.binary))
                }
                _ => SearchError::Io(e),
            })?;

        if !output.status.success() {
            return Err(match classify_failure(&String::from_utf8_lossy(&output.stderr)) {
                TranscodeError::RateLimited(message) => SearchError::RateLimited(message),
                other => SearchError::Failed(other.to_string()),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_hits(&stdout)
    }
}

/// Parses newline-delimited JSON entries, skipping ones without a locator.
fn parse_hits(stdout: &str) -> Result<Vec<SearchHit>, SearchError> {
    let mut hits = Vec::new();
    for line in stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let entry: FlatEntry = serde_json::from_str(line)
            .map_err(|e| SearchError::InvalidOutput(format!("JSON parse error: {}", e)))?;

        let Some(locator) = entry.locator() else {
            warn!("Skipping search entry without id or url");
            continue;
        };

        hits.push(SearchHit {
            title: entry.title.unwrap_or_default(),
            duration_secs: entry
                .duration
                .filter(|d| d.is_finite() && *d >= 0.0)
                .map(|d| d.round() as u64),
            locator,
        });
    }
    Ok(hits)
}
