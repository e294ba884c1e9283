//! Per-playlist `tracklist.csv` sink shared by all workers.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const MANIFEST_FILE_NAME: &str = "tracklist.csv";
pub const MANIFEST_HEADER: &str = "Artist,Title,YouTube URL";

/// Appends one CSV row per downloaded track.
///
/// Every append holds the lock for the whole row and flushes before
/// releasing it, so rows from concurrent workers never interleave.
pub struct ManifestWriter {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl ManifestWriter {
    /// Creates (or truncates) the manifest and writes the header.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create manifest {:?}", path))?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", MANIFEST_HEADER).context("Failed to write manifest header")?;
        writer.flush().context("Failed to flush manifest")?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(writer),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, artist: &str, title: &str, source_url: &str) -> Result<()> {
        let row = format!(
            "{},{},{}",
            csv_field(artist),
            csv_field(title),
            csv_field(source_url)
        );

        let mut writer = self
            .writer
            .lock()
            .map_err(|_| anyhow::anyhow!("Manifest writer lock poisoned"))?;
        writeln!(writer, "{}", row).context("Failed to append manifest row")?;
        writer.flush().context("Failed to flush manifest")?;
        Ok(())
    }
}

/// Quotes a field when it contains a comma, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains(&[',', '"', '\n', '\r'][..]) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_csv_quoting() {
        assert_eq!(csv_field("Daft Punk"), "Daft Punk");
        assert_eq!(csv_field("Earth, Wind & Fire"), "\"Earth, Wind & Fire\"");
        assert_eq!(csv_field("12\" Mix"), "\"12\"\" Mix\"");
    }

    #[test]
    fn test_create_truncates_and_writes_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(MANIFEST_FILE_NAME);
        std::fs::write(&path, "stale,row,here\n").unwrap();

        let manifest = ManifestWriter::create(&path).unwrap();
        manifest
            .append("Earth, Wind & Fire", "September", "https://youtu.be/x")
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "Artist,Title,YouTube URL\n\"Earth, Wind & Fire\",September,https://youtu.be/x\n"
        );
    }

    #[test]
    fn test_concurrent_appends_do_not_interleave() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(MANIFEST_FILE_NAME);
        let manifest = Arc::new(ManifestWriter::create(&path).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let manifest = manifest.clone();
                std::thread::spawn(move || {
                    for i in 0..25 {
                        manifest
                            .append(
                                &format!("Artist {}", worker),
                                &format!("Title {}", i),
                                "https://www.youtube.com/watch?v=abc",
                            )
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 1 + 8 * 25);
        for line in &lines[1..] {
            assert_eq!(line.split(',').count(), 3, "malformed row: {}", line);
            assert!(line.starts_with("Artist "));
        }
    }
}
