// Domain rules - Business logic and policies

use std::ops::Range;

use crate::domain::errors::*;
use crate::domain::model::*;

/// Shortest extraction window worth encoding, in seconds
pub const MIN_CLIP_SECONDS: f64 = 1.0;

/// Existing outputs above this size count as already produced
pub const MIN_VIABLE_OUTPUT_BYTES: u64 = 1024 * 1024;

/// Crop/scale/pad arithmetic. Pure; every conversion truncates.
pub struct GeometryEngine;

impl GeometryEngine {
    /// Map a source frame onto a target frame
    pub fn compute_region(
        source_width: u32,
        source_height: u32,
        target_width: u32,
        target_height: u32,
        side: Side,
        mode: GeometryMode,
    ) -> Result<GeometryRegion, DomainError> {
        if source_width == 0 || source_height == 0 {
            return Err(DomainError::InvalidGeometry(format!(
                "source dimensions {}x{} must be non-zero",
                source_width, source_height
            )));
        }
        if target_width == 0 || target_height == 0 {
            return Err(DomainError::InvalidGeometry(format!(
                "target dimensions {}x{} must be non-zero",
                target_width, target_height
            )));
        }

        match mode {
            GeometryMode::FullFrame => Ok(GeometryRegion {
                crop_x: 0,
                crop_y: 0,
                crop_width: source_width,
                crop_height: source_height,
                output_width: target_width,
                output_height: target_height,
                pad_top: 0,
                pad_bottom: 0,
                pad_left: 0,
                pad_right: 0,
            }),
            GeometryMode::ZoomStretch { zoom, trim } => {
                let window = Self::zoom_trim_window(source_width, source_height, side, zoom, trim)?;
                Ok(window.scaled_to(target_width, target_height))
            }
            GeometryMode::Letterbox { zoom, trim } => {
                let window = Self::zoom_trim_window(source_width, source_height, side, zoom, trim)?;
                let scaled_height =
                    (window.height as u64 * target_width as u64 / window.width as u64) as u32;
                if scaled_height == 0 {
                    return Err(DomainError::InvalidGeometry(format!(
                        "crop {}x{} collapses to zero height at width {}",
                        window.width, window.height, target_width
                    )));
                }

                if scaled_height <= target_height {
                    let padding = target_height - scaled_height;
                    let mut region = window.scaled_to(target_width, scaled_height);
                    region.pad_top = padding / 2;
                    region.pad_bottom = padding - region.pad_top;
                    return Ok(region);
                }

                // Too tall at full width: fit the height and pad the sides
                let scaled_width =
                    (window.width as u64 * target_height as u64 / window.height as u64) as u32;
                if scaled_width == 0 {
                    return Err(DomainError::InvalidGeometry(format!(
                        "crop {}x{} collapses to zero width at height {}",
                        window.width, window.height, target_height
                    )));
                }
                let padding = target_width.saturating_sub(scaled_width);
                let mut region = window.scaled_to(scaled_width.min(target_width), target_height);
                region.pad_left = padding / 2;
                region.pad_right = padding - region.pad_left;
                Ok(region)
            }
            GeometryMode::Fill => {
                let mut crop_width =
                    (source_height as u64 * target_width as u64 / target_height as u64) as u32;
                let mut crop_height = source_height;
                if crop_width > source_width {
                    crop_width = source_width;
                    crop_height =
                        (source_width as u64 * target_height as u64 / target_width as u64) as u32;
                }
                if crop_width == 0 || crop_height == 0 {
                    return Err(DomainError::InvalidGeometry(format!(
                        "fill crop for {}x{} -> {}x{} is empty",
                        source_width, source_height, target_width, target_height
                    )));
                }

                let window = CropWindow {
                    x: Self::side_offset(source_width, crop_width, side),
                    y: (source_height - crop_height) / 2,
                    width: crop_width,
                    height: crop_height,
                };
                Ok(window.scaled_to(target_width, target_height))
            }
        }
    }

    /// Zoom inward, then trim `trim` of the zoomed width from the side opposite the bias
    fn zoom_trim_window(
        source_width: u32,
        source_height: u32,
        side: Side,
        zoom: f64,
        trim: f64,
    ) -> Result<CropWindow, DomainError> {
        if !zoom.is_finite() || zoom < 1.0 {
            return Err(DomainError::InvalidGeometry(format!(
                "zoom factor {} must be at least 1.0",
                zoom
            )));
        }
        if !(0.0..1.0).contains(&trim) {
            return Err(DomainError::InvalidGeometry(format!(
                "trim fraction {} must be in [0, 1)",
                trim
            )));
        }

        let zoomed_width = (source_width as f64 / zoom) as u32;
        let zoomed_height = (source_height as f64 / zoom) as u32;
        let visible_width = (zoomed_width as f64 * (1.0 - trim)) as u32;

        if visible_width == 0 || zoomed_height == 0 {
            return Err(DomainError::InvalidGeometry(format!(
                "zoom {} with trim {} leaves an empty crop of {}x{}",
                zoom, trim, source_width, source_height
            )));
        }

        Ok(CropWindow {
            x: Self::side_offset(source_width, visible_width, side),
            y: (source_height - zoomed_height) / 2,
            width: visible_width,
            height: zoomed_height,
        })
    }

    fn side_offset(source_width: u32, crop_width: u32, side: Side) -> u32 {
        match side {
            Side::Left => 0,
            Side::Right => source_width - crop_width,
            Side::Center => (source_width - crop_width) / 2,
        }
    }
}

/// Crop rectangle before scaling
#[derive(Debug, Clone, Copy)]
struct CropWindow {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

impl CropWindow {
    fn scaled_to(self, width: u32, height: u32) -> GeometryRegion {
        GeometryRegion {
            crop_x: self.x,
            crop_y: self.y,
            crop_width: self.width,
            crop_height: self.height,
            output_width: width,
            output_height: height,
            pad_top: 0,
            pad_bottom: 0,
            pad_left: 0,
            pad_right: 0,
        }
    }
}

/// Extraction window policy around an event timestamp
pub struct ClipWindowRule {
    pub pre_roll_seconds: f64,
    pub post_roll_seconds: f64,
}

impl ClipWindowRule {
    pub fn new(pre_roll_seconds: f64, post_roll_seconds: f64) -> Self {
        Self {
            pre_roll_seconds,
            post_roll_seconds,
        }
    }

    /// `[max(0, ts - pre), min(duration, ts + post)]`, rejected below `MIN_CLIP_SECONDS`
    pub fn resolve(&self, timestamp: f64, source_duration: f64) -> Result<(f64, f64), DomainError> {
        let start = (timestamp - self.pre_roll_seconds).max(0.0);
        let end = (timestamp + self.post_roll_seconds).min(source_duration);

        if end - start < MIN_CLIP_SECONDS {
            return Err(DomainError::InvalidClipWindow(format!(
                "window [{:.2}, {:.2}] is shorter than {:.1}s (timestamp {:.2}s, recording {:.2}s)",
                start, end, MIN_CLIP_SECONDS, timestamp, source_duration
            )));
        }
        Ok((start, end))
    }
}

/// Social platform duration caps for compilation parts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformLimit {
    InstagramReels,
    InstagramStories,
    FacebookStories,
}

impl PlatformLimit {
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value.trim().to_lowercase().replace('_', "-").as_str() {
            "instagram-reels" | "reels" => Ok(PlatformLimit::InstagramReels),
            "instagram-stories" | "stories" => Ok(PlatformLimit::InstagramStories),
            "facebook-stories" => Ok(PlatformLimit::FacebookStories),
            other => Err(DomainError::BadArgs(format!(
                "Invalid platform: {}. Valid platforms: instagram-reels, instagram-stories, facebook-stories",
                other
            ))),
        }
    }

    pub fn max_seconds(&self) -> f64 {
        match self {
            PlatformLimit::InstagramReels => 90.0,
            PlatformLimit::InstagramStories => 15.0,
            PlatformLimit::FacebookStories => 20.0,
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            PlatformLimit::InstagramReels => "instagram_reels",
            PlatformLimit::InstagramStories => "instagram_stories",
            PlatformLimit::FacebookStories => "facebook_stories",
        }
    }

    /// Greedy consecutive grouping under the cap; an oversized clip gets a part of its own
    pub fn split_parts(&self, durations: &[f64]) -> Vec<Range<usize>> {
        let limit = self.max_seconds();
        let mut parts = Vec::new();
        let mut start = 0;
        let mut total = 0.0;

        for (index, duration) in durations.iter().enumerate() {
            if index > start && total + duration > limit {
                parts.push(start..index);
                start = index;
                total = 0.0;
            }
            total += duration;
        }
        if start < durations.len() {
            parts.push(start..durations.len());
        }
        parts
    }
}

/// Deterministic output file names
pub struct OutputNaming;

impl OutputNaming {
    /// `<stem>_<camera>_clip<NNN>_<ts>s<suffix>.mp4`
    pub fn clip_file_name(
        recording_stem: &str,
        camera: &str,
        placement: u32,
        timestamp: f64,
        format: TargetFormat,
    ) -> String {
        format!(
            "{}_{}_clip{:03}_{:.2}s{}.mp4",
            Self::sanitize(recording_stem),
            Self::sanitize(camera),
            placement,
            timestamp,
            format.clip_suffix()
        )
    }

    /// Weekly compilation name for a format and date
    pub fn compilation_file_name(format: TargetFormat, date: &str) -> String {
        match format {
            TargetFormat::Vertical => format!("Weekly_Highlight_{}.mp4", date),
            TargetFormat::Horizontal => format!("Weekly_Highlight_Horizontal_{}.mp4", date),
            TargetFormat::Source => format!("Weekly_Highlight_Source_{}.mp4", date),
        }
    }

    /// `<platform>_Part<N>_<yyyymmdd>.mp4`, parts numbered from 1
    pub fn platform_part_file_name(platform: PlatformLimit, part: usize, compact_date: &str) -> String {
        format!("{}_Part{}_{}.mp4", platform.slug(), part, compact_date)
    }

    /// `<stem>-<suffix>.mp4`
    pub fn compressed_file_name(stem: &str, suffix: &str) -> String {
        format!("{}-{}.mp4", stem, suffix)
    }

    /// Keep names shell- and filesystem-safe
    pub fn sanitize(value: &str) -> String {
        value
            .trim()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }
}

/// Frame rates closer than this count as equal
pub const FRAMERATE_TOLERANCE: f64 = 0.1;

/// Pixel format assumed when the probe reports none
pub const DEFAULT_PIXEL_FORMAT: &str = "yuv420p";

/// Stream parameters that must agree before two recordings can be joined
/// without re-encoding
pub struct FormatMatch;

impl FormatMatch {
    pub fn codec(asset: &SourceAsset) -> String {
        asset
            .codec
            .as_deref()
            .unwrap_or("h264")
            .trim()
            .to_lowercase()
    }

    pub fn pixel_format(asset: &SourceAsset) -> String {
        asset
            .pixel_format
            .as_deref()
            .unwrap_or(DEFAULT_PIXEL_FORMAT)
            .trim()
            .to_lowercase()
    }

    /// Codec, frame size, frame rate and pixel format all agree
    pub fn matches(reference: &SourceAsset, target: &SourceAsset) -> bool {
        Self::codec(reference) == Self::codec(target)
            && reference.width == target.width
            && reference.height == target.height
            && (reference.framerate - target.framerate).abs() <= FRAMERATE_TOLERANCE
            && Self::pixel_format(reference) == Self::pixel_format(target)
    }
}
