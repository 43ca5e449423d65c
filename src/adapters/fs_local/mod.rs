// Local filesystem adapter - File system operations on the host filesystem

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;
use walkdir::WalkDir;

use crate::domain::errors::*;
use crate::ports::*;

/// Extensions recognised as camera recordings
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "flv", "wmv", "m4v", "webm"];

/// Local filesystem adapter
#[derive(Debug, Default, Clone)]
pub struct FsLocalAdapter;

impl FsLocalAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Case-insensitive extension check
    pub fn is_video(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                VIDEO_EXTENSIONS
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }
}

#[async_trait]
impl FsPort for FsLocalAdapter {
    async fn file_size(&self, path: &Path) -> Result<Option<u64>, DomainError> {
        match tokio::fs::metadata(path).await {
            Ok(metadata) if metadata.is_file() => Ok(Some(metadata.len())),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(DomainError::FsFail(format!(
                "Failed to stat {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn create_directory(&self, path: &Path) -> Result<(), DomainError> {
        tokio::fs::create_dir_all(path).await.map_err(|e| {
            DomainError::FsFail(format!(
                "Failed to create directory {}: {}",
                path.display(),
                e
            ))
        })
    }

    async fn remove_file(&self, path: &Path) -> Result<(), DomainError> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                debug!("Removed {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DomainError::FsFail(format!(
                "Failed to remove {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn list_videos(&self, folder: &Path) -> Result<Vec<PathBuf>, DomainError> {
        let folder = folder.to_path_buf();
        let listing = tokio::task::spawn_blocking(move || {
            let mut videos = Vec::new();
            for entry in WalkDir::new(&folder).min_depth(1).max_depth(1) {
                let entry = entry.map_err(|e| {
                    DomainError::FsFail(format!("Failed to list {}: {}", folder.display(), e))
                })?;
                if entry.file_type().is_file() && Self::is_video(entry.path()) {
                    videos.push(entry.into_path());
                }
            }
            videos.sort();
            Ok::<_, DomainError>(videos)
        })
        .await
        .map_err(|e| DomainError::FsFail(format!("Directory listing task failed: {}", e)))??;

        debug!("Found {} video files", listing.len());
        Ok(listing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_list_videos_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        for name in ["b_cam2.MP4", "a_cam1.mov", "notes.txt", "c_cam3.webm"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.mp4")).unwrap();

        let adapter = FsLocalAdapter::new();
        let videos = adapter.list_videos(dir.path()).await.unwrap();
        let names: Vec<_> = videos
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a_cam1.mov", "b_cam2.MP4", "c_cam3.webm"]);
    }

    #[tokio::test]
    async fn test_missing_files_are_not_errors() {
        let dir = TempDir::new().unwrap();
        let adapter = FsLocalAdapter::new();
        let missing = dir.path().join("gone.mp4");

        assert_eq!(adapter.file_size(&missing).await.unwrap(), None);
        adapter.remove_file(&missing).await.unwrap();

        std::fs::write(&missing, vec![0u8; 42]).unwrap();
        assert_eq!(adapter.file_size(&missing).await.unwrap(), Some(42));
        adapter.remove_file(&missing).await.unwrap();
        assert!(!missing.exists());
    }

    #[tokio::test]
    async fn test_listing_missing_folder_fails() {
        let adapter = FsLocalAdapter::new();
        assert!(adapter
            .list_videos(Path::new("/nonexistent/camreel/recordings"))
            .await
            .is_err());
    }
}
