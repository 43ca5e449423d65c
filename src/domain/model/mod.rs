// Domain models - Core types and data structures

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;
use crate::utils::time::TimeParser;

/// Time specification in seconds with fractional precision
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct TimeSpec {
    pub seconds: f64,
}

impl TimeSpec {
    /// Create a new TimeSpec from seconds
    pub fn from_seconds(seconds: f64) -> Self {
        Self { seconds }
    }

    /// Parse `HH:MM:SS`, `MM:SS` or bare seconds. Fractional seconds are allowed in the last field.
    pub fn parse(time_str: &str) -> Result<Self, DomainError> {
        let trimmed = time_str.trim();
        let invalid = || DomainError::InvalidTimeFormat(trimmed.to_string());

        if trimmed.is_empty() {
            return Err(invalid());
        }

        if let Ok(seconds) = trimmed.parse::<f64>() {
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(invalid());
            }
            return Ok(Self::from_seconds(seconds));
        }

        let parts: Vec<&str> = trimmed.split(':').collect();
        let (hours, minutes, seconds) = match parts.as_slice() {
            [m, s] => (0u32, *m, *s),
            [h, m, s] => (h.parse::<u32>().map_err(|_| invalid())?, *m, *s),
            _ => return Err(invalid()),
        };

        let minutes = minutes.parse::<u32>().map_err(|_| invalid())?;
        let seconds = seconds.parse::<f64>().map_err(|_| invalid())?;

        if parts.len() == 3 && minutes >= 60 {
            return Err(invalid());
        }
        if !(0.0..60.0).contains(&seconds) {
            return Err(invalid());
        }

        Ok(Self::from_seconds(
            hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds,
        ))
    }

    /// Format as HH:MM:SS.ms
    pub fn format_hms(&self) -> String {
        TimeParser::format_clock(self.seconds)
    }
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_hms())
    }
}

/// Which edge of the frame survives the crop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
    #[default]
    Center,
}

impl Side {
    /// Parse a side label, case-insensitive. Unknown labels yield `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "left" | "l" => Some(Side::Left),
            "right" | "r" => Some(Side::Right),
            "center" | "centre" | "c" | "" => Some(Side::Center),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
            Side::Center => "center",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the event sheet
#[derive(Debug, Clone, PartialEq)]
pub struct EventRow {
    /// Line in the source file, for diagnostics
    pub line: usize,
    pub camera: String,
    pub timestamp: TimeSpec,
    pub placement: u32,
    pub side: Side,
}

/// A row that never became an encode job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedRow {
    pub line: usize,
    pub camera: Option<String>,
    pub placement: Option<u32>,
    pub reason: String,
}

impl RejectedRow {
    pub fn for_event(row: &EventRow, reason: impl Into<String>) -> Self {
        Self {
            line: row.line,
            camera: Some(row.camera.clone()),
            placement: Some(row.placement),
            reason: reason.into(),
        }
    }
}

/// Parsed event sheet: usable rows plus the ones that were rejected while reading
#[derive(Debug, Clone, Default)]
pub struct EventSheet {
    pub rows: Vec<EventRow>,
    pub invalid: Vec<RejectedRow>,
}

/// A camera recording, probed once per run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceAsset {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub duration_seconds: f64,
    pub framerate: f64,
    pub has_audio: bool,
    pub size_bytes: u64,
    /// Video codec name as reported by the probe
    #[serde(default)]
    pub codec: Option<String>,
    #[serde(default)]
    pub pixel_format: Option<String>,
}

/// A resolved extraction window for one event
#[derive(Debug, Clone, PartialEq)]
pub struct ClipSpec {
    pub camera_id: String,
    pub placement: u32,
    pub event_timestamp: f64,
    pub side: Side,
    pub window_start: f64,
    pub window_end: f64,
}

impl ClipSpec {
    pub fn duration(&self) -> f64 {
        self.window_end - self.window_start
    }
}

/// Frame dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// How a source frame is mapped onto the target frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeometryMode {
    /// Whole source frame scaled to the target, no crop
    FullFrame,
    /// Zoom, trim the far side, then stretch to the exact target size
    ZoomStretch { zoom: f64, trim: f64 },
    /// Zoom and trim, scale to target width keeping aspect, pad vertically
    Letterbox { zoom: f64, trim: f64 },
    /// Crop the target aspect straight from the source bounds
    Fill,
}

/// Crop rectangle plus the scale/pad applied after it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeometryRegion {
    pub crop_x: u32,
    pub crop_y: u32,
    pub crop_width: u32,
    pub crop_height: u32,
    /// Size the crop is scaled to, before padding
    pub output_width: u32,
    pub output_height: u32,
    pub pad_top: u32,
    pub pad_bottom: u32,
    #[serde(default)]
    pub pad_left: u32,
    #[serde(default)]
    pub pad_right: u32,
}

impl GeometryRegion {
    /// Final frame width including padding
    pub fn canvas_width(&self) -> u32 {
        self.output_width + self.pad_left + self.pad_right
    }

    /// Final frame height including padding
    pub fn canvas_height(&self) -> u32 {
        self.output_height + self.pad_top + self.pad_bottom
    }

    pub fn is_padded(&self) -> bool {
        self.pad_top + self.pad_bottom + self.pad_left + self.pad_right > 0
    }
}

/// Output framing requested on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    /// Keep the recording's own frame
    Source,
    /// 16:9 zoom-stretch
    Horizontal,
    /// 9:16, framed per `VerticalFit`
    Vertical,
}

impl TargetFormat {
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value.trim().to_lowercase().as_str() {
            "source" | "original" => Ok(TargetFormat::Source),
            "horizontal" | "16:9" | "landscape" => Ok(TargetFormat::Horizontal),
            "vertical" | "9:16" | "portrait" => Ok(TargetFormat::Vertical),
            other => Err(DomainError::BadArgs(format!(
                "Invalid format: {}. Valid formats: source, horizontal, vertical",
                other
            ))),
        }
    }

    /// File name suffix for per-clip outputs
    pub fn clip_suffix(&self) -> &'static str {
        match self {
            TargetFormat::Source => "",
            TargetFormat::Horizontal => "_horizontal",
            TargetFormat::Vertical => "_vertical",
        }
    }
}

/// How vertical output handles the aspect change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VerticalFit {
    Zoom,
    #[default]
    Letterbox,
    Fill,
}

impl VerticalFit {
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value.trim().to_lowercase().as_str() {
            "zoom" | "stretch" => Ok(VerticalFit::Zoom),
            "letterbox" | "pad" => Ok(VerticalFit::Letterbox),
            "fill" | "crop" => Ok(VerticalFit::Fill),
            other => Err(DomainError::BadArgs(format!(
                "Invalid fit: {}. Valid fits: zoom, letterbox, fill",
                other
            ))),
        }
    }
}

/// Corner a text overlay is pinned to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OverlayAnchor {
    TopLeft,
    TopRight,
    #[default]
    BottomLeft,
    BottomRight,
}

/// Characters `drawtext` option parsing treats as separators
pub const OPTION_SPECIALS: &[char] = &['\\', '\'', ':'];
/// Characters the filtergraph parser treats as separators
pub const GRAPH_SPECIALS: &[char] = &['\\', '\'', '[', ']', ',', ';'];

/// Burned-in text. `text` holds the fully escaped form embedded in the filter graph.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySpec {
    pub text: String,
    pub anchor: OverlayAnchor,
    pub font_size: u32,
}

impl OverlaySpec {
    /// Build an overlay from raw text, escaping it for both parser levels
    pub fn caption(raw: &str, anchor: OverlayAnchor, font_size: u32) -> Self {
        let option_level = escape_chars(raw, OPTION_SPECIALS);
        Self {
            text: escape_chars(&option_level, GRAPH_SPECIALS),
            anchor,
            font_size,
        }
    }
}

/// Backslash-escape every occurrence of `specials`
pub fn escape_chars(text: &str, specials: &[char]) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if specials.contains(&ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Undo one level of escaping. Fails on a bare special or a dangling backslash.
pub fn unescape_chars(text: &str, specials: &[char]) -> Result<String, char> {
    let mut plain = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some(next) => plain.push(next),
                None => return Err('\\'),
            }
        } else if specials.contains(&ch) {
            return Err(ch);
        } else {
            plain.push(ch);
        }
    }
    Ok(plain)
}

/// Encoder family; closed set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncoderKind {
    Hardware,
    Software,
}

impl EncoderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EncoderKind::Hardware => "hardware",
            EncoderKind::Software => "software",
        }
    }
}

impl fmt::Display for EncoderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable encoder parameter set
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderProfile {
    pub kind: EncoderKind,
    pub codec_name: String,
    /// Ordered flag/value pairs placed after `-c:v <codec>`
    pub rate_control: Vec<(String, String)>,
    /// CQ for hardware, CRF for software
    pub quality_level: u8,
}

impl EncoderProfile {
    /// Video encoder arguments for the external tool
    pub fn args(&self) -> Vec<String> {
        self.args_with_pixel_format(None)
    }

    /// Same as `args`, with `-pix_fmt` replaced (or added) when `pixel_format` is set
    pub fn args_with_pixel_format(&self, pixel_format: Option<&str>) -> Vec<String> {
        let mut args = vec!["-c:v".to_string(), self.codec_name.clone()];
        let mut pixel_format_set = false;
        for (flag, value) in &self.rate_control {
            args.push(flag.clone());
            match pixel_format {
                Some(format) if flag == "-pix_fmt" => {
                    args.push(format.to_string());
                    pixel_format_set = true;
                }
                _ => args.push(value.clone()),
            }
        }
        if let (Some(format), false) = (pixel_format, pixel_format_set) {
            args.push("-pix_fmt".to_string());
            args.push(format.to_string());
        }
        args
    }
}

/// Named quality tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum QualityPreset {
    HighQuality,
    #[default]
    Balanced,
    MaximumCompression,
}

impl QualityPreset {
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value.trim().to_lowercase().replace('_', "-").as_str() {
            "high-quality" | "high" => Ok(QualityPreset::HighQuality),
            "balanced" => Ok(QualityPreset::Balanced),
            "maximum-compression" | "max" | "small" => Ok(QualityPreset::MaximumCompression),
            other => Err(DomainError::BadArgs(format!(
                "Invalid quality preset: {}. Valid presets: high-quality, balanced, maximum-compression",
                other
            ))),
        }
    }

    /// Constant-quality level for the hardware encoder
    pub fn cq(&self) -> u8 {
        match self {
            QualityPreset::HighQuality => 19,
            QualityPreset::Balanced => 23,
            QualityPreset::MaximumCompression => 28,
        }
    }

    /// NVENC speed preset
    pub fn nvenc_preset(&self) -> &'static str {
        match self {
            QualityPreset::HighQuality => "p7",
            QualityPreset::Balanced => "p5",
            QualityPreset::MaximumCompression => "p4",
        }
    }

    pub fn audio_bitrate(&self) -> &'static str {
        match self {
            QualityPreset::HighQuality => "192k",
            QualityPreset::Balanced => "128k",
            QualityPreset::MaximumCompression => "96k",
        }
    }
}

/// Where one input of a job reads from
#[derive(Debug, Clone, PartialEq)]
pub struct SourceClipRef {
    pub path: PathBuf,
    pub start_seconds: f64,
    /// `None` reads to the end of the file
    pub duration_seconds: Option<f64>,
    pub has_audio: bool,
}

/// One input of an encode job, in concatenation order
#[derive(Debug, Clone, PartialEq)]
pub struct JobInput {
    pub source: SourceClipRef,
    pub region: GeometryRegion,
    pub overlay: Option<OverlaySpec>,
}

/// Unit of work for the encode orchestrator
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeJob {
    /// Stable identifier, the placement for clip jobs
    pub id: u32,
    pub label: String,
    pub inputs: Vec<JobInput>,
    pub output_path: PathBuf,
    pub profiles: Vec<EncoderProfile>,
    pub framerate: f64,
    pub audio_bitrate: String,
    /// Crossfade between consecutive inputs; 0 joins them with hard cuts
    pub transition_seconds: f64,
    /// Output pixel format overriding the profile's
    pub pixel_format: Option<String>,
}

impl EncodeJob {
    /// Sum of input durations when every input is bounded, less crossfade overlaps
    pub fn expected_seconds(&self) -> Option<f64> {
        let total: f64 = self
            .inputs
            .iter()
            .map(|input| input.source.duration_seconds)
            .sum::<Option<f64>>()?;
        let overlap = crossfade_seconds(&self.inputs, self.transition_seconds)
            .map(|fade| fade * (self.inputs.len() - 1) as f64)
            .unwrap_or(0.0);
        Some(total - overlap)
    }
}

/// The crossfade length actually applied to `inputs`: `None` for a single
/// input, a zero length, or any input that is unbounded or not longer than the fade
pub fn crossfade_seconds(inputs: &[JobInput], transition_seconds: f64) -> Option<f64> {
    if inputs.len() < 2 || !(transition_seconds > 0.0) {
        return None;
    }
    inputs
        .iter()
        .all(|input| {
            input
                .source
                .duration_seconds
                .is_some_and(|duration| duration > transition_seconds)
        })
        .then_some(transition_seconds)
}

/// Frame rate as a tool argument: at most three decimals, no trailing zeros
pub fn rate_arg(framerate: f64) -> String {
    let text = format!("{:.3}", framerate);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Terminal status of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobStatus {
    Success,
    SkippedExisting,
    Failed,
}

/// Recorded result of one job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutcome {
    pub job_id: u32,
    pub label: String,
    pub output_path: PathBuf,
    pub status: JobStatus,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub attempts_used: u32,
    pub encoder_used: Option<EncoderKind>,
    pub error: Option<String>,
    /// Failure belongs in the retry batch
    pub retryable: bool,
    /// Outcome came from the retry pass
    pub retried: bool,
}

impl JobOutcome {
    pub fn new(job: &EncodeJob, status: JobStatus) -> Self {
        Self {
            job_id: job.id,
            label: job.label.clone(),
            output_path: job.output_path.clone(),
            status,
            bytes_in: 0,
            bytes_out: 0,
            attempts_used: 0,
            encoder_used: None,
            error: None,
            retryable: false,
            retried: false,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == JobStatus::Failed
    }
}
