//! Configuration initialization and hierarchy management

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::{Cli, Commands, EncodeArgs, SelectionArgs};
use crate::domain::errors::DomainError;
use crate::domain::model::QualityPreset;
use crate::domain::settings::PipelineConfig;
use crate::ports::ConfigPort;

/// Build the run configuration following precedence: CLI > Env > File > Defaults
pub async fn initialize_configuration_hierarchy(
    config_port: &dyn ConfigPort,
    cli: &Cli,
) -> Result<PipelineConfig> {
    info!("Initializing configuration hierarchy");

    let mut config = config_port
        .load_config(cli.config.as_deref())
        .await
        .context("Failed to load configuration file")?;

    let env_overrides = apply_env_overrides(&mut config, |key| std::env::var(key).ok())
        .context("Invalid environment override")?;
    if env_overrides > 0 {
        info!("Applied {} environment variable overrides", env_overrides);
    }

    let cli_overrides = apply_cli_overrides(&mut config, cli);
    if cli_overrides > 0 {
        info!("Applied {} CLI configuration overrides", cli_overrides);
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, DomainError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| DomainError::Config(format!("{}={}: {}", key, value, e)))
}

fn parse_env_bool(key: &str, value: &str) -> Result<bool, DomainError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(DomainError::Config(format!(
            "{}={}: expected a boolean",
            key, value
        ))),
    }
}

/// Apply `CAMREEL_*` variables from `lookup`; returns how many were set
pub fn apply_env_overrides<F>(config: &mut PipelineConfig, lookup: F) -> Result<usize, DomainError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut applied = 0;
    let mut found = |key: &str| {
        let value = lookup(key);
        if let Some(value) = &value {
            debug!("Found environment override: {} = {}", key, value);
            applied += 1;
        }
        value
    };

    if let Some(value) = found("CAMREEL_FFMPEG") {
        config.tools.ffmpeg = value;
    }
    if let Some(value) = found("CAMREEL_FFPROBE") {
        config.tools.ffprobe = value;
    }
    if let Some(value) = found("CAMREEL_PRE_ROLL") {
        config.clips.pre_roll_seconds = parse_env("CAMREEL_PRE_ROLL", &value)?;
    }
    if let Some(value) = found("CAMREEL_POST_ROLL") {
        config.clips.post_roll_seconds = parse_env("CAMREEL_POST_ROLL", &value)?;
    }
    if let Some(value) = found("CAMREEL_TRANSITION") {
        config.clips.transition_seconds = parse_env("CAMREEL_TRANSITION", &value)?;
    }
    if let Some(value) = found("CAMREEL_OUTPUT_DIR") {
        config.output.dir = PathBuf::from(value);
    }
    if let Some(value) = found("CAMREEL_CPU_ONLY") {
        config.encoder.cpu_only = parse_env_bool("CAMREEL_CPU_ONLY", &value)?;
    }
    if let Some(value) = found("CAMREEL_QUALITY") {
        config.encoder.quality = QualityPreset::parse(&value)?;
    }
    if let Some(value) = found("CAMREEL_CQ") {
        config.encoder.cq = Some(parse_env("CAMREEL_CQ", &value)?);
    }

    Ok(applied)
}

fn apply_selection(config: &mut PipelineConfig, selection: &SelectionArgs) -> usize {
    let mut applied = 0;
    if let Some(fit) = selection.fit {
        config.vertical.fit = fit;
        applied += 1;
    }
    if selection.caption {
        config.clips.caption = true;
        applied += 1;
    }
    if let Some(pre_roll) = selection.pre_roll {
        config.clips.pre_roll_seconds = pre_roll;
        applied += 1;
    }
    if let Some(post_roll) = selection.post_roll {
        config.clips.post_roll_seconds = post_roll;
        applied += 1;
    }
    applied
}

fn apply_encode(config: &mut PipelineConfig, encode: &EncodeArgs) -> usize {
    let mut applied = 0;
    if let Some(quality) = encode.quality {
        config.encoder.quality = quality;
        applied += 1;
    }
    if let Some(cq) = encode.cq {
        config.encoder.cq = Some(cq);
        applied += 1;
    }
    applied
}

/// Apply command-line overrides; returns how many were set
pub fn apply_cli_overrides(config: &mut PipelineConfig, cli: &Cli) -> usize {
    let mut applied = 0;

    if cli.cpu_only {
        config.encoder.cpu_only = true;
        applied += 1;
    }
    if let Some(output) = &cli.output {
        config.output.dir = output.clone();
        applied += 1;
    }

    applied += match &cli.command {
        Commands::Extract(args) => {
            apply_selection(config, &args.selection) + apply_encode(config, &args.encode)
        }
        Commands::Compile(args) => {
            let mut applied =
                apply_selection(config, &args.selection) + apply_encode(config, &args.encode);
            if let Some(transition) = args.transition {
                config.clips.transition_seconds = transition;
                applied += 1;
            }
            applied
        }
        Commands::Compress(args) => {
            let mut applied = apply_encode(config, &args.encode);
            if let Some(suffix) = &args.suffix {
                config.output.compress_suffix = suffix.clone();
                applied += 1;
            }
            applied
        }
        Commands::Match(args) => apply_encode(config, &args.encode),
        Commands::Encoders => 0,
    };

    applied
}
