//! Drives one encode job through its encoder profiles

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::domain::errors::DomainError;
use crate::domain::model::*;
use crate::domain::rules::MIN_VIABLE_OUTPUT_BYTES;
use crate::engine::filter_graph::{FilterGraphBuilder, FilterInvocation};
use crate::engine::progress::{describe_elapsed, ProgressCallback, ProgressTracker};
use crate::ports::{FsPort, MediaToolPort};

/// Anything that can take a job to a terminal outcome
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn run_job(&self, job: &EncodeJob) -> JobOutcome;
}

/// Per-job attempt state
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptState<'p> {
    Pending,
    Attempting(&'p EncoderProfile),
    AttemptFailed(EncoderKind),
    Succeeded(EncoderKind),
    Failed,
}

impl<'p> AttemptState<'p> {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AttemptState::Succeeded(_) | AttemptState::Failed)
    }
}

/// Spawns the media tool for each attempt and applies the fallback order
pub struct EncodeOrchestrator {
    tool: Arc<dyn MediaToolPort>,
    fs: Arc<dyn FsPort>,
    progress: Arc<dyn ProgressCallback>,
    inline_filter_limit: usize,
}

impl EncodeOrchestrator {
    pub fn new(
        tool: Arc<dyn MediaToolPort>,
        fs: Arc<dyn FsPort>,
        progress: Arc<dyn ProgressCallback>,
        inline_filter_limit: usize,
    ) -> Self {
        Self {
            tool,
            fs,
            progress,
            inline_filter_limit,
        }
    }

    /// Full argument vector for one attempt
    pub fn build_args(
        job: &EncodeJob,
        invocation: &FilterInvocation,
        profile: &EncoderProfile,
    ) -> Vec<String> {
        let mut args: Vec<String> = ["-hide_banner", "-nostdin", "-y"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        for input in &job.inputs {
            if input.source.start_seconds > 0.0 {
                args.push("-ss".to_string());
                args.push(format!("{:.3}", input.source.start_seconds));
            }
            if let Some(duration) = input.source.duration_seconds {
                args.push("-t".to_string());
                args.push(format!("{:.3}", duration));
            }
            args.push("-i".to_string());
            args.push(input.source.path.to_string_lossy().to_string());
        }

        args.extend(invocation.args());
        args.extend(profile.args_with_pixel_format(job.pixel_format.as_deref()));

        if invocation.program().audio_label.is_some() {
            args.extend(
                ["-c:a", "aac", "-b:a", job.audio_bitrate.as_str()]
                    .iter()
                    .map(|s| s.to_string()),
            );
        } else {
            args.push("-an".to_string());
        }

        args.push("-r".to_string());
        args.push(rate_arg(job.framerate));
        args.push("-movflags".to_string());
        args.push("+faststart".to_string());
        args.push(job.output_path.to_string_lossy().to_string());
        args
    }

    async fn size_of(&self, path: &std::path::Path) -> u64 {
        match self.fs.file_size(path).await {
            Ok(size) => size.unwrap_or(0),
            Err(e) => {
                debug!("Cannot stat {}: {}", path.display(), e);
                0
            }
        }
    }

    /// One spawn of the media tool with one profile
    async fn attempt(
        &self,
        job: &EncodeJob,
        invocation: &FilterInvocation,
        profile: &EncoderProfile,
    ) -> Result<(), DomainError> {
        let args = Self::build_args(job, invocation, profile);
        debug!("Running media tool: {}", args.join(" "));

        let total = job.expected_seconds();
        self.progress.on_start(&job.label, profile.kind.as_str(), total);

        let mut tracker = ProgressTracker::new();
        let progress = Arc::clone(&self.progress);
        let label = job.label.clone();
        let mut on_line = |line: &str| {
            if let Some(elapsed) = tracker.observe(line) {
                progress.on_progress(&label, elapsed, total);
            }
        };

        let exit = self
            .tool
            .run(&args, &mut on_line)
            .await
            .map_err(|e| DomainError::AttemptFailed {
                encoder: profile.kind.to_string(),
                message: e.to_string(),
            })?;

        if exit.success {
            self.progress.on_complete(&job.label);
            return Ok(());
        }

        let status = match exit.code {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        };
        let detail = exit
            .stderr_tail
            .iter()
            .rev()
            .find(|line| !line.trim().is_empty())
            .cloned()
            .unwrap_or_default();
        let error = DomainError::AttemptFailed {
            encoder: profile.kind.to_string(),
            message: if detail.is_empty() {
                status
            } else {
                format!("{}: {}", status, detail)
            },
        };
        self.progress.on_error(&job.label, &error.to_string());
        Err(error)
    }

    /// Drop a partially written output so it cannot pass for a finished one
    async fn discard_partial(&self, job: &EncodeJob) {
        if let Err(e) = self.fs.remove_file(&job.output_path).await {
            warn!("Could not remove partial output {}: {}", job.output_path.display(), e);
        }
    }
}

#[async_trait]
impl JobRunner for EncodeOrchestrator {
    async fn run_job(&self, job: &EncodeJob) -> JobOutcome {
        let started = Instant::now();
        let mut outcome = JobOutcome::new(job, JobStatus::Failed);
        for input in &job.inputs {
            outcome.bytes_in += self.size_of(&input.source.path).await;
        }

        let existing = self.size_of(&job.output_path).await;
        if existing > MIN_VIABLE_OUTPUT_BYTES {
            info!(job = %job.label, "Output already exists ({} bytes), skipping", existing);
            outcome.status = JobStatus::SkippedExisting;
            outcome.bytes_out = existing;
            return outcome;
        }
        if existing > 0 {
            info!(job = %job.label, "Replacing incomplete output ({} bytes)", existing);
            self.discard_partial(job).await;
        }

        // The script file, if any, lives exactly as long as `invocation`
        let invocation = match FilterGraphBuilder::new(job.framerate)
            .with_transition(job.transition_seconds)
            .build(&job.inputs)
            .and_then(|program| program.into_invocation(self.inline_filter_limit))
        {
            Ok(invocation) => invocation,
            Err(e) => {
                warn!(job = %job.label, "Cannot build filter graph: {}", e);
                outcome.retryable = e.is_retryable();
                outcome.error = Some(e.to_string());
                return outcome;
            }
        };

        let mut profiles = job.profiles.iter();
        let mut state = AttemptState::Pending;
        let mut last_error: Option<DomainError> = None;

        while !state.is_terminal() {
            state = match state {
                AttemptState::Pending => match profiles.next() {
                    Some(profile) => AttemptState::Attempting(profile),
                    None => {
                        last_error = Some(DomainError::Failed(
                            "no encoder profiles to attempt".to_string(),
                        ));
                        AttemptState::Failed
                    }
                },
                AttemptState::Attempting(profile) => {
                    outcome.attempts_used += 1;
                    info!(
                        job = %job.label,
                        encoder = %profile.kind,
                        attempt = outcome.attempts_used,
                        "Encoding with {}",
                        profile.codec_name
                    );
                    match self.attempt(job, &invocation, profile).await {
                        Ok(()) => AttemptState::Succeeded(profile.kind),
                        Err(e) => {
                            warn!(job = %job.label, encoder = %profile.kind, "{}", e);
                            self.discard_partial(job).await;
                            last_error = Some(e);
                            AttemptState::AttemptFailed(profile.kind)
                        }
                    }
                }
                AttemptState::AttemptFailed(kind) => match profiles.next() {
                    Some(profile) => {
                        info!(job = %job.label, "{} encoder failed, falling back to {}", kind, profile.kind);
                        AttemptState::Attempting(profile)
                    }
                    None => AttemptState::Failed,
                },
                terminal => terminal,
            };
        }

        match state {
            AttemptState::Succeeded(kind) => {
                outcome.status = JobStatus::Success;
                outcome.encoder_used = Some(kind);
                outcome.bytes_out = self.size_of(&job.output_path).await;
                info!(
                    job = %job.label,
                    encoder = %kind,
                    "Encoded {} in {}",
                    job.output_path.display(),
                    describe_elapsed(started.elapsed())
                );
            }
            _ => {
                let error = last_error
                    .unwrap_or_else(|| DomainError::Failed("all encoders failed".to_string()));
                outcome.retryable = error.is_retryable();
                outcome.error = Some(error.to_string());
            }
        }
        outcome
    }
}
