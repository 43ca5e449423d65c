//! CLI module for camreel
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;

pub use args::{CompileArgs, CompressArgs, EncodeArgs, ExtractArgs, MatchArgs, SelectionArgs};

/// camreel - camera event clips and highlight reels
///
/// Cuts a short clip around every event in a CSV sheet, reframes it for
/// horizontal or vertical delivery and encodes it with NVENC when available,
/// falling back to x264.
#[derive(Parser, Debug)]
#[command(name = "camreel")]
#[command(about = "camreel - Camera event clips and highlight reels")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Logging level (RUST_LOG takes precedence)
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    /// Emit logs and progress as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Configuration file (TOML, or YAML by extension)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Never try the hardware encoder
    #[arg(long, global = true)]
    pub cpu_only: bool,

    /// Output directory
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Write the batch report as JSON to this file
    #[arg(long, global = true)]
    pub report: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Per-attempt console lines at `debug` and `trace`
    pub fn verbose(&self) -> bool {
        matches!(
            self.log_level.trim().to_lowercase().as_str(),
            "debug" | "trace"
        )
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Cut one clip per event row
    Extract(ExtractArgs),
    /// Join every event clip into one highlight compilation
    Compile(CompileArgs),
    /// Re-encode a folder of recordings at a quality preset
    Compress(CompressArgs),
    /// Convert a recording to the stream parameters of a reference recording
    Match(MatchArgs),
    /// Probe the hardware encoder and print the encoder order
    Encoders,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::TargetFormat;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_extract_with_globals() {
        let cli = Cli::parse_from([
            "camreel",
            "--cpu-only",
            "extract",
            "--events",
            "events.csv",
            "--format",
            "horizontal",
            "--cq",
            "21",
            "-o",
            "reels",
        ]);

        assert!(cli.cpu_only);
        assert_eq!(cli.output, Some(PathBuf::from("reels")));
        match cli.command {
            Commands::Extract(args) => {
                assert_eq!(args.selection.format, Some(TargetFormat::Horizontal));
                assert_eq!(args.selection.videos, PathBuf::from("video_files"));
                assert_eq!(args.encode.cq, Some(21));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_match_positionals() {
        let cli = Cli::parse_from(["camreel", "match", "gate.mp4", "phone.mov", "out/phone.mp4"]);
        match cli.command {
            Commands::Match(args) => {
                assert_eq!(args.reference, PathBuf::from("gate.mp4"));
                assert_eq!(args.target, PathBuf::from("phone.mov"));
                assert_eq!(args.output, PathBuf::from("out/phone.mp4"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_verbose_follows_log_level() {
        assert!(!Cli::parse_from(["camreel", "encoders"]).verbose());
        assert!(Cli::parse_from(["camreel", "--log-level", "debug", "encoders"]).verbose());
        assert!(Cli::parse_from(["camreel", "--log-level", "TRACE", "encoders"]).verbose());
        assert!(!Cli::parse_from(["camreel", "--log-level", "warn", "encoders"]).verbose());
    }
}
