//! Local scratch directories for in-flight media files.
//!
//! Instances keep raw downloads, transcoded outputs, and extracted audio in
//! separate directories so cleanup after a job can never touch another
//! job's artifacts by prefix accident.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use crate::error::MediaResult;

/// The three scratch directories used while processing a video.
#[derive(Debug, Clone)]
pub struct WorkDirs {
    /// Raw downloads, named by upload filename
    pub raw: PathBuf,
    /// Transcoded outputs, named by processed key
    pub processed: PathBuf,
    /// Extracted audio work files
    pub audio: PathBuf,
}

impl WorkDirs {
    /// Lay the directories out under a common root.
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            raw: root.join("raw-videos"),
            processed: root.join("processed-videos"),
            audio: root.join("audio"),
        }
    }

    /// Create all directories. Safe to call repeatedly.
    pub async fn ensure(&self) -> MediaResult<()> {
        for dir in [&self.raw, &self.processed, &self.audio] {
            fs::create_dir_all(dir).await?;
            debug!("Ensured directory {}", dir.display());
        }
        Ok(())
    }

    /// Local path for a raw download.
    pub fn raw_path(&self, filename: &str) -> PathBuf {
        self.raw.join(filename)
    }

    /// Local path for a transcoded output.
    pub fn processed_path(&self, filename: &str) -> PathBuf {
        self.processed.join(filename)
    }

    /// Local path for an extracted audio file.
    pub fn audio_path(&self, filename: &str) -> PathBuf {
        self.audio.join(filename)
    }
}

/// Remove a file if it exists. Removing a missing file is not an error.
pub async fn remove_file_if_exists(path: impl AsRef<Path>) -> MediaResult<()> {
    let path = path.as_ref();
    match fs::remove_file(path).await {
        Ok(()) => {
            debug!("Removed {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("{} already absent, nothing to remove", path.display());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_ensure_creates_all_directories() {
        let root = TempDir::new().unwrap();
        let dirs = WorkDirs::under(root.path());

        dirs.ensure().await.unwrap();
        assert!(dirs.raw.is_dir());
        assert!(dirs.processed.is_dir());
        assert!(dirs.audio.is_dir());

        // Idempotent
        dirs.ensure().await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_missing_file_is_ok() {
        let root = TempDir::new().unwrap();
        let path = root.path().join("nope.mp4");
        remove_file_if_exists(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_existing_file() {
        let root = TempDir::new().unwrap();
        let path = root.path().join("video.mp4");
        fs::write(&path, b"data").await.unwrap();

        remove_file_if_exists(&path).await.unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_paths_are_disjoint() {
        let dirs = WorkDirs::under("/tmp/work");
        assert_eq!(dirs.raw_path("v1.mp4"), PathBuf::from("/tmp/work/raw-videos/v1.mp4"));
        assert_eq!(
            dirs.processed_path("processed-v1.mp4"),
            PathBuf::from("/tmp/work/processed-videos/processed-v1.mp4")
        );
        assert_eq!(dirs.audio_path("v1.flac"), PathBuf::from("/tmp/work/audio/v1.flac"));
    }
}
