// Clip selector - Resolves event rows to recordings and extraction windows

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::*;
use crate::ports::*;

/// Looks up and probes one recording per camera, then windows each event
pub struct ClipSelector {
    fs_port: Arc<dyn FsPort>,
    probe_port: Arc<dyn ProbePort>,
    recordings_dir: PathBuf,
    window: ClipWindowRule,
    /// Probed recordings keyed by lowercase camera id
    assets: HashMap<String, SourceAsset>,
    listing: Option<Vec<PathBuf>>,
}

impl ClipSelector {
    pub fn new(
        fs_port: Arc<dyn FsPort>,
        probe_port: Arc<dyn ProbePort>,
        recordings_dir: impl Into<PathBuf>,
        window: ClipWindowRule,
    ) -> Self {
        Self {
            fs_port,
            probe_port,
            recordings_dir: recordings_dir.into(),
            window,
            assets: HashMap::new(),
            listing: None,
        }
    }

    /// First recording, by name, whose file name contains the camera id
    async fn find_recording(&mut self, camera: &str) -> Result<PathBuf, DomainError> {
        if self.listing.is_none() {
            let videos = self.fs_port.list_videos(&self.recordings_dir).await?;
            debug!(
                "Indexed {} recordings in {}",
                videos.len(),
                self.recordings_dir.display()
            );
            self.listing = Some(videos);
        }

        let needle = camera.to_lowercase();
        self.listing
            .iter()
            .flatten()
            .find(|path| {
                path.file_name()
                    .map(|name| name.to_string_lossy().to_lowercase().contains(&needle))
                    .unwrap_or(false)
            })
            .cloned()
            .ok_or_else(|| DomainError::AssetNotFound {
                camera: camera.to_string(),
                folder: self.recordings_dir.display().to_string(),
            })
    }

    /// Recording for a camera, probed on first use and cached for the run
    pub async fn resolve_asset(&mut self, camera: &str) -> Result<SourceAsset, DomainError> {
        let key = camera.trim().to_lowercase();
        if let Some(asset) = self.assets.get(&key) {
            return Ok(asset.clone());
        }

        let path = self.find_recording(&key).await?;
        let asset = self.probe_port.probe(&path).await?;
        info!(
            camera = %camera,
            "Using {} ({}x{}, {:.1}s{})",
            path.display(),
            asset.width,
            asset.height,
            asset.duration_seconds,
            if asset.has_audio { ", audio" } else { "" }
        );
        self.assets.insert(key, asset.clone());
        Ok(asset)
    }

    /// Clip window for one event row together with its recording
    pub async fn select(&mut self, row: &EventRow) -> Result<(ClipSpec, SourceAsset), DomainError> {
        let asset = self.resolve_asset(&row.camera).await?;
        let (window_start, window_end) = self
            .window
            .resolve(row.timestamp.seconds, asset.duration_seconds)?;

        let spec = ClipSpec {
            camera_id: row.camera.clone(),
            placement: row.placement,
            event_timestamp: row.timestamp.seconds,
            side: row.side,
            window_start,
            window_end,
        };
        Ok((spec, asset))
    }

    /// Number of distinct recordings probed so far
    pub fn cached_assets(&self) -> usize {
        self.assets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ListingFs {
        videos: Vec<PathBuf>,
        listings: AtomicUsize,
    }

    #[async_trait]
    impl FsPort for ListingFs {
        async fn file_size(&self, _path: &Path) -> Result<Option<u64>, DomainError> {
            Ok(None)
        }
        async fn create_directory(&self, _path: &Path) -> Result<(), DomainError> {
            Ok(())
        }
        async fn remove_file(&self, _path: &Path) -> Result<(), DomainError> {
            Ok(())
        }
        async fn list_videos(&self, _folder: &Path) -> Result<Vec<PathBuf>, DomainError> {
            self.listings.fetch_add(1, Ordering::SeqCst);
            Ok(self.videos.clone())
        }
    }

    struct CountingProbe {
        probes: AtomicUsize,
    }

    #[async_trait]
    impl ProbePort for CountingProbe {
        async fn probe(&self, path: &Path) -> Result<SourceAsset, DomainError> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            Ok(SourceAsset {
                path: path.to_path_buf(),
                width: 1920,
                height: 1080,
                duration_seconds: 100.0,
                framerate: 30.0,
                has_audio: true,
                size_bytes: 10_000_000,
                codec: Some("h264".to_string()),
                pixel_format: None,
            })
        }
    }

    fn selector() -> (ClipSelector, Arc<ListingFs>, Arc<CountingProbe>) {
        let fs = Arc::new(ListingFs {
            videos: vec![
                PathBuf::from("rec/2024_CAM1_north.mp4"),
                PathBuf::from("rec/2024_cam12_south.mp4"),
                PathBuf::from("rec/2024_cam2.mkv"),
            ],
            listings: AtomicUsize::new(0),
        });
        let probe = Arc::new(CountingProbe {
            probes: AtomicUsize::new(0),
        });
        let selector = ClipSelector::new(
            fs.clone(),
            probe.clone(),
            "rec",
            ClipWindowRule::new(3.0, 2.0),
        );
        (selector, fs, probe)
    }

    fn row(camera: &str, seconds: f64, placement: u32) -> EventRow {
        EventRow {
            line: placement as usize + 1,
            camera: camera.to_string(),
            timestamp: TimeSpec::from_seconds(seconds),
            placement,
            side: Side::Left,
        }
    }

    #[tokio::test]
    async fn test_windows_and_caches_assets() {
        let (mut selector, fs, probe) = selector();

        let (spec, asset) = selector.select(&row("cam1", 99.0, 1)).await.unwrap();
        assert_eq!(asset.path, PathBuf::from("rec/2024_CAM1_north.mp4"));
        assert_eq!((spec.window_start, spec.window_end), (96.0, 100.0));

        let (spec, _) = selector.select(&row("Cam1", 50.0, 2)).await.unwrap();
        assert_eq!((spec.window_start, spec.window_end), (47.0, 52.0));
        assert_eq!(spec.side, Side::Left);

        selector.select(&row("cam2", 1.0, 3)).await.unwrap();
        assert_eq!(probe.probes.load(Ordering::SeqCst), 2);
        assert_eq!(fs.listings.load(Ordering::SeqCst), 1);
        assert_eq!(selector.cached_assets(), 2);
    }

    #[tokio::test]
    async fn test_unknown_camera_and_short_window() {
        let (mut selector, _, probe) = selector();

        assert!(matches!(
            selector.select(&row("cam9", 10.0, 1)).await,
            Err(DomainError::AssetNotFound { .. })
        ));
        assert!(matches!(
            selector.select(&row("cam1", 500.0, 2)).await,
            Err(DomainError::InvalidClipWindow(_))
        ));
        assert_eq!(probe.probes.load(Ordering::SeqCst), 1);
    }
}
