//! Album cover downloads.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::metadata::TrackDescriptor;
use crate::sanitize::underscored;

pub const ALBUM_ART_DIR: &str = "album_art";

/// Downloads album covers to `<output_root>/album_art/<artist>/<title>_cover.jpg`.
pub struct ArtworkFetcher {
    client: reqwest::Client,
    art_root: PathBuf,
}

impl ArtworkFetcher {
    pub fn new(output_root: &Path, timeout_sec: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            art_root: output_root.join(ALBUM_ART_DIR),
        })
    }

    pub fn cover_path(&self, artist: &str, title: &str) -> PathBuf {
        self.art_root
            .join(underscored(artist, "unknown_artist"))
            .join(format!("{}_cover.jpg", underscored(title, "untitled")))
    }

    /// Returns the local cover path, downloading it first if needed.
    ///
    /// Never fails: problems are logged and yield `None`.
    pub async fn fetch(&self, track: &TrackDescriptor) -> Option<PathBuf> {
        let dest = self.cover_path(&track.artist, &track.title);
        if tokio::fs::try_exists(&dest).await.unwrap_or(false) {
            debug!("Reusing cover {:?}", dest);
            return Some(dest);
        }

        let Some(url) = track.album_art_url.as_deref() else {
            debug!("No album art for {}", track.display_name());
            return None;
        };

        match self.download_file(url, &dest).await {
            Ok(bytes) => {
                debug!("Saved {} byte cover for {}", bytes, track.display_name());
                Some(dest)
            }
            Err(e) => {
                warn!(
                    "Failed to download album art for {}: {:#}",
                    track.display_name(),
                    e
                );
                let _ = tokio::fs::remove_file(&dest).await;
                None
            }
        }
    }

    /// Returns the number of bytes written.
    async fn download_file(&self, url: &str, dest: &Path) -> Result<u64> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to connect for download")?;

        if !response.status().is_success() {
            anyhow::bail!("Download failed with status: {}", response.status());
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create parent directories")?;
        }

        let bytes = response
            .bytes()
            .await
            .context("Failed to read response body")?;

        let mut file = File::create(dest)
            .await
            .context("Failed to create destination file")?;

        file.write_all(&bytes)
            .await
            .context("Failed to write to file")?;

        file.flush().await.context("Failed to flush file")?;

        Ok(bytes.len() as u64)
    }
}
