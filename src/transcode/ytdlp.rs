//! Audio extraction using yt-dlp (which drives ffmpeg itself).

use super::{TranscodeBackend, TranscodeError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Extracts the audio track of a remote video as a fixed-bitrate mp3.
pub struct YtDlpTranscoder {
    binary: String,
    bitrate_kbps: u32,
}

impl YtDlpTranscoder {
    pub fn new(binary: impl Into<String>, bitrate_kbps: u32) -> Self {
        Self {
            binary: binary.into(),
            bitrate_kbps,
        }
    }

    /// Check that the yt-dlp binary can be executed.
    pub async fn check_available(&self) -> Result<String, TranscodeError> {
        let output = Command::new(&self.binary)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                TranscodeError::BackendUnavailable(format!("{}: {}", self.binary, e))
            })?;

        if !output.status.success() {
            return Err(TranscodeError::BackendUnavailable(format!(
                "{} --version exited with {}",
                self.binary, output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn args(&self, locator: &str, output_stem: &Path) -> Vec<String> {
        vec![
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            "mp3".to_string(),
            "--audio-quality".to_string(),
            format!("{}K", self.bitrate_kbps),
            "--no-playlist".to_string(),
            "--no-progress".to_string(),
            "--no-warnings".to_string(),
            "--no-simulate".to_string(),
            "--print".to_string(),
            "after_move:filepath".to_string(),
            "--output".to_string(),
            output_template(output_stem),
            "--".to_string(),
            locator.to_string(),
        ]
    }
}

/// `<stem>.%(ext)s`, with literal `%` in the stem escaped.
fn output_template(output_stem: &Path) -> String {
    format!("{}.%(ext)s", output_stem.to_string_lossy().replace('%', "%%"))
}

/// Maps yt-dlp's stderr to an error kind.
pub(crate) fn classify_failure(stderr: &str) -> TranscodeError {
    let message = stderr
        .lines()
        .rev()
        .find(|line| line.contains("ERROR"))
        .unwrap_or(stderr)
        .trim()
        .to_string();
    let lowered = message.to_lowercase();

    const RATE_LIMITED: &[&str] = &["http error 429", "too many requests", "not a bot"];
    const UNAVAILABLE: &[&str] = &[
        "video unavailable",
        "private video",
        "not available",
        "has been removed",
        "sign in to confirm",
        "copyright",
    ];
    const NETWORK: &[&str] = &[
        "http error 5",
        "timed out",
        "connection",
        "temporary failure",
        "network is unreachable",
        "unable to download",
    ];

    if RATE_LIMITED.iter().any(|m| lowered.contains(m)) {
        TranscodeError::RateLimited(message)
    } else if lowered.contains("unsupported url") {
        TranscodeError::Unsupported(message)
    } else if UNAVAILABLE.iter().any(|m| lowered.contains(m)) {
        TranscodeError::SourceUnavailable(message)
    } else if NETWORK.iter().any(|m| lowered.contains(m)) {
        TranscodeError::Network(message)
    } else {
        TranscodeError::Failed(message)
    }
}

#[async_trait]
impl TranscodeBackend for YtDlpTranscoder {
    async fn fetch(&self, locator: &str, output_stem: &Path) -> Result<PathBuf, TranscodeError> {
        if let Some(parent) = output_stem.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        debug!("Running {} for {} -> {:?}", self.binary, locator, output_stem);
        let output = Command::new(&self.binary)
            .args(self.args(locator, output_stem))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    TranscodeError::BackendUnavailable(format!("{} not found in PATH", self.binary))
                }
                _ => TranscodeError::Io(e),
            })?;

        if !output.status.success() {
            return Err(classify_failure(&String::from_utf8_lossy(&output.stderr)));
        }

        // The last printed line is the file after post-processing.
        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
            .map(PathBuf::from)
            .ok_or_else(|| TranscodeError::Failed("yt-dlp did not report an output file".to_string()))
    }
}
