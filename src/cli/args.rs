//! Command-line argument definitions

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Args;

use crate::domain::model::{QualityPreset, TargetFormat, VerticalFit};
use crate::domain::rules::PlatformLimit;

fn parse_format(value: &str) -> Result<TargetFormat, String> {
    TargetFormat::parse(value).map_err(|e| e.to_string())
}

fn parse_fit(value: &str) -> Result<VerticalFit, String> {
    VerticalFit::parse(value).map_err(|e| e.to_string())
}

fn parse_quality(value: &str) -> Result<QualityPreset, String> {
    QualityPreset::parse(value).map_err(|e| e.to_string())
}

fn parse_platform(value: &str) -> Result<PlatformLimit, String> {
    PlatformLimit::parse(value).map_err(|e| e.to_string())
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD: {}", e))
}

fn parse_cq(value: &str) -> Result<u8, String> {
    clap_num::number_range(value, 0, 51)
}

fn parse_seconds(value: &str) -> Result<f64, String> {
    let seconds: f64 = value.parse().map_err(|e| format!("{}", e))?;
    if seconds.is_finite() && seconds >= 0.0 {
        Ok(seconds)
    } else {
        Err("must be a non-negative number of seconds".to_string())
    }
}

/// Event sheet, recordings and framing
#[derive(Args, Debug, Clone)]
pub struct SelectionArgs {
    /// CSV event sheet (Camera, Timestamp/Time, Placement, Side)
    #[arg(short, long)]
    pub events: PathBuf,

    /// Folder holding one recording per camera
    #[arg(short, long, default_value = "video_files")]
    pub videos: PathBuf,

    /// Output framing: source, horizontal or vertical
    #[arg(short, long, value_parser = parse_format)]
    pub format: Option<TargetFormat>,

    /// Vertical framing: zoom, letterbox or fill
    #[arg(long, value_parser = parse_fit)]
    pub fit: Option<VerticalFit>,

    /// Burn a camera/placement caption into each clip
    #[arg(long)]
    pub caption: bool,

    /// Seconds kept before each event
    #[arg(long, value_parser = parse_seconds)]
    pub pre_roll: Option<f64>,

    /// Seconds kept after each event
    #[arg(long, value_parser = parse_seconds)]
    pub post_roll: Option<f64>,
}

/// Encoder quality options
#[derive(Args, Debug, Clone, Default)]
pub struct EncodeArgs {
    /// Quality preset: high-quality, balanced or maximum-compression
    #[arg(short, long, value_parser = parse_quality)]
    pub quality: Option<QualityPreset>,

    /// Constant-quality override (0-51, lower is better)
    #[arg(long, value_parser = parse_cq)]
    pub cq: Option<u8>,
}

/// Arguments for the extract command
#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    #[command(flatten)]
    pub encode: EncodeArgs,
}

/// Arguments for the compile command
#[derive(Args, Debug, Clone)]
pub struct CompileArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    #[command(flatten)]
    pub encode: EncodeArgs,

    /// Split into parts for a platform cap: instagram-reels, instagram-stories, facebook-stories
    #[arg(long, value_parser = parse_platform)]
    pub platform: Option<PlatformLimit>,

    /// Date used in the output name (default: today)
    #[arg(long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,

    /// Crossfade length between clips in seconds (0 for hard cuts)
    #[arg(long, value_parser = parse_seconds)]
    pub transition: Option<f64>,
}

/// Arguments for the compress command
#[derive(Args, Debug, Clone)]
pub struct CompressArgs {
    /// Folder of recordings to compress
    #[arg(short, long, default_value = "video_files")]
    pub input: PathBuf,

    /// Only files whose name contains this text
    #[arg(short, long)]
    pub pattern: Option<String>,

    /// Suffix for compressed copies
    #[arg(long)]
    pub suffix: Option<String>,

    #[command(flatten)]
    pub encode: EncodeArgs,
}

/// Arguments for the match command
#[derive(Args, Debug, Clone)]
pub struct MatchArgs {
    /// Recording whose codec, size, frame rate and pixel format are copied
    pub reference: PathBuf,

    /// Recording to convert
    pub target: PathBuf,

    /// Where the converted copy is written
    pub output: PathBuf,

    #[command(flatten)]
    pub encode: EncodeArgs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_parsers() {
        assert_eq!(parse_format("9:16").unwrap(), TargetFormat::Vertical);
        assert!(parse_format("square").is_err());
        assert_eq!(parse_cq("28").unwrap(), 28);
        assert!(parse_cq("52").is_err());
        assert_eq!(parse_seconds("2.5").unwrap(), 2.5);
        assert!(parse_seconds("-1").is_err());
        assert_eq!(
            parse_date("2024-03-04").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
        );
        assert!(parse_date("04/03/2024").is_err());
    }
}
