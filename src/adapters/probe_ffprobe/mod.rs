//! FFprobe adapter for media file probing
//!
//! Runs `ffprobe -print_format json` and maps the first video stream (size,
//! rate, codec, pixel format) plus the container duration onto a `SourceAsset`.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

/// FFprobe-based probe adapter
pub struct FFprobeAdapter {
    binary: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    pix_fmt: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
    size: Option<String>,
}

impl FFprobeAdapter {
    /// Create new FFprobe adapter
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    /// Map ffprobe JSON onto a source asset
    pub fn parse_output(path: &Path, json: &str) -> Result<SourceAsset, DomainError> {
        let output: ProbeOutput = serde_json::from_str(json)?;
        let video = output
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
            .ok_or_else(|| {
                DomainError::ProbeFail(format!("{} has no video stream", path.display()))
            })?;
        let has_audio = output
            .streams
            .iter()
            .any(|s| s.codec_type.as_deref() == Some("audio"));

        let (width, height) = match (video.width, video.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
            _ => {
                return Err(DomainError::ProbeFail(format!(
                    "{} has no frame dimensions",
                    path.display()
                )))
            }
        };

        let format = output.format.as_ref();
        let duration_seconds = format
            .and_then(|f| f.duration.as_deref())
            .or(video.duration.as_deref())
            .and_then(|d| d.parse::<f64>().ok())
            .filter(|d| d.is_finite() && *d > 0.0)
            .ok_or_else(|| DomainError::ProbeFail(format!("{} has no duration", path.display())))?;

        let framerate = [video.avg_frame_rate.as_deref(), video.r_frame_rate.as_deref()]
            .into_iter()
            .flatten()
            .find_map(parse_rate)
            .unwrap_or(30.0);

        let size_bytes = format
            .and_then(|f| f.size.as_deref())
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);

        Ok(SourceAsset {
            path: path.to_path_buf(),
            width,
            height,
            duration_seconds,
            framerate,
            has_audio,
            size_bytes,
            codec: video.codec_name.clone(),
            pixel_format: video.pix_fmt.clone(),
        })
    }
}

/// `30000/1001` or `25` to frames per second; `0/0` yields `None`
fn parse_rate(rate: &str) -> Option<f64> {
    let value = match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate.parse().ok()?,
    };
    (value.is_finite() && value > 0.0).then_some(value)
}

#[async_trait]
impl ProbePort for FFprobeAdapter {
    async fn probe(&self, path: &Path) -> Result<SourceAsset, DomainError> {
        debug!("Probing {}", path.display());
        let output = Command::new(&self.binary)
            .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, output)
            .await
            .map_err(|_| {
                DomainError::ProbeFail(format!(
                    "{} timed out on {}",
                    self.binary,
                    path.display()
                ))
            })?
            .map_err(|e| DomainError::ProbeFail(format!("cannot run {}: {}", self.binary, e)))?;

        if !output.status.success() {
            return Err(DomainError::ProbeFail(format!(
                "{} failed on {}: {}",
                self.binary,
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Self::parse_output(path, &String::from_utf8_lossy(&output.stdout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            {"index": 0, "codec_type": "video", "codec_name": "h264", "pix_fmt": "yuvj420p",
             "width": 1920, "height": 1080,
             "avg_frame_rate": "30000/1001", "r_frame_rate": "30000/1001"},
            {"index": 1, "codec_type": "audio", "sample_rate": "48000"}
        ],
        "format": {"duration": "1000.500000", "size": "52428800"}
    }"#;

    #[test]
    fn test_parse_probe_output() {
        let asset = FFprobeAdapter::parse_output(Path::new("cam1.mp4"), SAMPLE).unwrap();
        assert_eq!((asset.width, asset.height), (1920, 1080));
        assert_eq!(asset.duration_seconds, 1000.5);
        assert!((asset.framerate - 29.97).abs() < 0.01);
        assert!(asset.has_audio);
        assert_eq!(asset.size_bytes, 52_428_800);
        assert_eq!(asset.codec.as_deref(), Some("h264"));
        assert_eq!(asset.pixel_format.as_deref(), Some("yuvj420p"));
    }

    #[test]
    fn test_parse_rejects_audio_only() {
        let json = r#"{"streams": [{"codec_type": "audio"}], "format": {"duration": "5"}}"#;
        assert!(matches!(
            FFprobeAdapter::parse_output(Path::new("a.m4a"), json),
            Err(DomainError::ProbeFail(_))
        ));
    }

    #[test]
    fn test_parse_rate() {
        assert_eq!(parse_rate("25/1"), Some(25.0));
        assert_eq!(parse_rate("30"), Some(30.0));
        assert_eq!(parse_rate("0/0"), None);
    }
}
