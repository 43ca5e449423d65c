//! camreel CLI
//!
//! Turns a sheet of timestamped camera events into encoded clips and
//! highlight compilations.
//!
//! # Features
//!
//! - Per-event clip extraction with configurable pre/post roll
//! - Horizontal zoom-stretch and vertical zoom/letterbox/fill framing
//! - Weekly compilations, optionally split to social platform caps
//! - NVENC encoding with automatic x264 fallback and one retry pass
//!
//! # Usage
//!
//! ```bash
//! camreel extract --events events.csv --videos recordings --format horizontal
//! camreel compile --events events.csv --videos recordings --platform instagram-reels
//! camreel compress --input recordings --quality balanced
//! camreel match gate_cam.mp4 phone.mov phone_matched.mp4
//! camreel encoders
//! ```

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use camreel_cli::adapters::{TomlConfigAdapter, TracingLogAdapter};
use camreel_cli::app::DefaultAppContainer;
use camreel_cli::cli::{commands, Cli, Commands};
use camreel_cli::config_initialization::initialize_configuration_hierarchy;
use camreel_cli::engine::{ConsoleProgressCallback, JsonProgressCallback, ProgressCallback};

/// Main entry point for the camreel CLI application
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    TracingLogAdapter::init(&cli.log_level, cli.log_json)?;
    info!("Starting camreel");

    let config_port = TomlConfigAdapter::new();
    let config = initialize_configuration_hierarchy(&config_port, &cli).await?;

    let progress: Arc<dyn ProgressCallback> = if cli.log_json {
        Arc::new(JsonProgressCallback)
    } else {
        Arc::new(ConsoleProgressCallback::new(cli.verbose()))
    };
    let container = DefaultAppContainer::new(config, progress);
    let report_path = cli.report.as_deref();

    // Execute the requested command
    match cli.command {
        Commands::Extract(args) => {
            info!("Executing extract command");
            commands::extract(&container, args, report_path).await?;
        }
        Commands::Compile(args) => {
            info!("Executing compile command");
            commands::compile(&container, args, report_path).await?;
        }
        Commands::Compress(args) => {
            info!("Executing compress command");
            commands::compress(&container, args, report_path).await?;
        }
        Commands::Match(args) => {
            info!("Executing match command");
            commands::match_reference(&container, args, report_path).await?;
        }
        Commands::Encoders => {
            commands::encoders(&container).await?;
        }
    }

    info!("camreel completed");
    Ok(())
}
