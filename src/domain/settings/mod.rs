// Domain settings - Typed run configuration with defaults

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;
use crate::domain::model::{QualityPreset, Resolution, VerticalFit};

/// Complete configuration for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    pub clips: ClipSettings,
    pub horizontal: FrameSettings,
    pub vertical: VerticalSettings,
    pub encoder: EncoderSettings,
    pub output: OutputSettings,
    pub scheduler: SchedulerSettings,
    pub tools: ToolSettings,
}

impl PipelineConfig {
    /// Reject values the geometry or encoder layers cannot work with
    pub fn validate(&self) -> Result<(), DomainError> {
        if !(self.clips.pre_roll_seconds >= 0.0) || !(self.clips.post_roll_seconds >= 0.0) {
            return Err(DomainError::Config(
                "pre_roll_seconds and post_roll_seconds must be non-negative".to_string(),
            ));
        }
        if !(self.clips.transition_seconds >= 0.0) || !self.clips.transition_seconds.is_finite() {
            return Err(DomainError::Config(
                "transition_seconds must be a non-negative number".to_string(),
            ));
        }
        self.horizontal.validate("horizontal")?;
        self.vertical.frame().validate("vertical")?;

        if self.encoder.framerate == 0 {
            return Err(DomainError::Config("framerate must be positive".to_string()));
        }
        if let Some(cq) = self.encoder.cq {
            if cq > 51 {
                return Err(DomainError::Config("cq cannot exceed 51".to_string()));
            }
        }
        if self.tools.probe_timeout_secs == 0 {
            return Err(DomainError::Config(
                "probe_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Extraction window around each event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipSettings {
    pub pre_roll_seconds: f64,
    pub post_roll_seconds: f64,
    /// Burn a camera/placement caption into each clip
    pub caption: bool,
    pub caption_font_size: u32,
    /// Crossfade between compilation clips; 0 joins them with hard cuts
    pub transition_seconds: f64,
}

impl Default for ClipSettings {
    fn default() -> Self {
        Self {
            pre_roll_seconds: 3.0,
            post_roll_seconds: 2.0,
            caption: false,
            caption_font_size: 36,
            transition_seconds: 0.0,
        }
    }
}

/// Target frame plus zoom/trim for the zoom-based modes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameSettings {
    pub width: u32,
    pub height: u32,
    pub zoom: f64,
    pub trim: f64,
}

impl FrameSettings {
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    fn validate(&self, section: &str) -> Result<(), DomainError> {
        if self.width == 0 || self.height == 0 {
            return Err(DomainError::Config(format!(
                "[{}] resolution must be non-zero",
                section
            )));
        }
        if !(self.zoom >= 1.0) {
            return Err(DomainError::Config(format!(
                "[{}] zoom must be at least 1.0",
                section
            )));
        }
        if !(0.0..1.0).contains(&self.trim) {
            return Err(DomainError::Config(format!(
                "[{}] trim must be in [0, 1)",
                section
            )));
        }
        Ok(())
    }
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            zoom: 1.15,
            trim: 0.15,
        }
    }
}

/// Vertical output framing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerticalSettings {
    pub width: u32,
    pub height: u32,
    pub zoom: f64,
    pub trim: f64,
    pub fit: VerticalFit,
}

impl VerticalSettings {
    pub fn frame(&self) -> FrameSettings {
        FrameSettings {
            width: self.width,
            height: self.height,
            zoom: self.zoom,
            trim: self.trim,
        }
    }
}

impl Default for VerticalSettings {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            zoom: 1.10,
            trim: 0.30,
            fit: VerticalFit::Letterbox,
        }
    }
}

/// Encoder profile inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderSettings {
    pub quality: QualityPreset,
    /// Overrides the preset's CQ (0-51)
    pub cq: Option<u8>,
    /// Software CRF is CQ minus this offset
    pub software_crf_offset: u8,
    pub hardware_codec: String,
    pub software_codec: String,
    pub software_preset: String,
    pub max_bitrate: String,
    pub buffer_size: String,
    pub threads: usize,
    pub framerate: u32,
    /// Skip the hardware probe and encode in software only
    pub cpu_only: bool,
}

impl EncoderSettings {
    pub fn effective_cq(&self) -> u8 {
        self.cq.unwrap_or_else(|| self.quality.cq())
    }

    pub fn software_crf(&self) -> u8 {
        self.effective_cq().saturating_sub(self.software_crf_offset)
    }
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            quality: QualityPreset::Balanced,
            cq: None,
            software_crf_offset: 4,
            hardware_codec: "h264_nvenc".to_string(),
            software_codec: "libx264".to_string(),
            software_preset: "veryfast".to_string(),
            max_bitrate: "50M".to_string(),
            buffer_size: "10M".to_string(),
            threads: num_cpus::get().clamp(1, 16),
            framerate: 30,
            cpu_only: false,
        }
    }
}

/// Where and how outputs are written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub dir: PathBuf,
    /// Filter graphs longer than this go to a script file
    pub inline_filter_limit: usize,
    /// Suffix for compressed copies, `<stem>-<suffix>.mp4`
    pub compress_suffix: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            inline_filter_limit: 4096,
            compress_suffix: "compressed".to_string(),
        }
    }
}

/// Batch retry behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    pub retry_failed: bool,
    /// Fixed seed for the retry shuffle
    pub shuffle_seed: Option<u64>,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            retry_failed: true,
            shuffle_seed: None,
        }
    }
}

/// External binaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub ffmpeg: String,
    pub ffprobe: String,
    pub probe_timeout_secs: u64,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            probe_timeout_secs: 5,
        }
    }
}
