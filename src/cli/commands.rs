//! Command implementations

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::{info, warn};

use crate::app::{
    AppContainer, CompileRequest, CompressRequest, MatchOutcome, MatchRequest,
    PipelineInteractor, SelectionRequest,
};
use crate::cli::args::{CompileArgs, CompressArgs, ExtractArgs, MatchArgs, SelectionArgs};
use crate::domain::model::{EncoderKind, TargetFormat};
use crate::output::BatchReport;

fn selection_request(args: &SelectionArgs, default_format: TargetFormat) -> SelectionRequest {
    SelectionRequest {
        events_path: args.events.clone(),
        recordings_dir: args.videos.clone(),
        format: args.format.unwrap_or(default_format),
    }
}

/// Print the summary and, when asked, persist the JSON report.
/// Job failures are reported, not turned into a process error.
fn finish(report: &BatchReport, report_path: Option<&Path>) -> Result<()> {
    report.print_summary();
    if let Some(path) = report_path {
        report
            .write_json(path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
    }
    if report.has_failures() {
        warn!("{} job(s) failed", report.totals.failed);
    }
    Ok(())
}

/// Execute the extract command
pub async fn extract(
    container: &dyn AppContainer,
    args: ExtractArgs,
    report_path: Option<&Path>,
) -> Result<()> {
    info!("Starting extract operation");
    let interactor = container.pipeline_interactor();
    let request = selection_request(&args.selection, TargetFormat::Source);
    info!("Events: {}", request.events_path.display());
    info!("Recordings: {}", request.recordings_dir.display());

    let report = interactor
        .extract(request)
        .await
        .context("Extract batch aborted")?;
    finish(&report, report_path)
}

/// Execute the compile command
pub async fn compile(
    container: &dyn AppContainer,
    args: CompileArgs,
    report_path: Option<&Path>,
) -> Result<()> {
    info!("Starting compile operation");
    let interactor = container.pipeline_interactor();
    let request = CompileRequest {
        selection: selection_request(&args.selection, TargetFormat::Vertical),
        platform: args.platform,
        date: args.date.unwrap_or_else(|| Local::now().date_naive()),
    };

    let report = interactor
        .compile(request)
        .await
        .context("Compile batch aborted")?;
    finish(&report, report_path)
}

/// Execute the compress command
pub async fn compress(
    container: &dyn AppContainer,
    args: CompressArgs,
    report_path: Option<&Path>,
) -> Result<()> {
    info!("Starting compress operation");
    let interactor = container.pipeline_interactor();
    let request = CompressRequest {
        input_dir: args.input,
        pattern: args.pattern,
    };

    let report = interactor
        .compress(request)
        .await
        .context("Compress batch aborted")?;
    finish(&report, report_path)
}

/// Execute the match command
pub async fn match_reference(
    container: &dyn AppContainer,
    args: MatchArgs,
    report_path: Option<&Path>,
) -> Result<()> {
    info!("Starting match operation");
    let interactor = container.pipeline_interactor();
    let request = MatchRequest {
        reference: args.reference,
        target: args.target,
        output: args.output,
    };
    let target = request.target.clone();

    let outcome = interactor
        .match_reference(request)
        .await
        .context("Match aborted")?;
    match outcome {
        MatchOutcome::AlreadyMatching => {
            println!(
                "{} already matches the reference, nothing written",
                target.display()
            );
            Ok(())
        }
        MatchOutcome::Converted(report) => finish(&report, report_path),
    }
}

/// Execute the encoders command
pub async fn encoders(container: &dyn AppContainer) -> Result<()> {
    let interactor = container.pipeline_interactor();
    display_encoders(&interactor).await;
    Ok(())
}

async fn display_encoders(interactor: &PipelineInteractor) {
    let report = interactor.probe_encoders().await;
    let settings = &interactor.config().encoder;

    println!("Encoder Information:");
    println!("  Media tool: {}", interactor.config().tools.ffmpeg);
    println!(
        "  Hardware encoder ({}): {}",
        settings.hardware_codec,
        if report.hardware_available {
            "available"
        } else {
            "not available"
        }
    );
    if settings.cpu_only {
        println!("  Hardware encoding disabled (--cpu-only)");
    }
    println!("  Attempt order:");
    for (index, profile) in report.profiles.iter().enumerate() {
        let quality = match profile.kind {
            EncoderKind::Hardware => format!("cq {}", profile.quality_level),
            EncoderKind::Software => format!("crf {}", profile.quality_level),
        };
        println!(
            "    {}. {} ({}, {})",
            index + 1,
            profile.codec_name,
            profile.kind,
            quality
        );
        println!("       {}", profile.args().join(" "));
    }
}
