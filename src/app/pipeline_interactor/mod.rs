// Pipeline interactor - Orchestrates the extract, compile, compress and match use cases

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{info, warn};

use crate::app::clip_selector::ClipSelector;
use crate::app::job_planner::{JobPlanner, SelectedClip};
use crate::app::scheduler::JobScheduler;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::*;
use crate::domain::settings::PipelineConfig;
use crate::engine::{EncoderSelector, JobRunner, ProfileRequest};
use crate::output::BatchReport;
use crate::ports::*;

/// Event sheet, recordings folder and output framing
#[derive(Debug, Clone)]
pub struct SelectionRequest {
    pub events_path: PathBuf,
    pub recordings_dir: PathBuf,
    pub format: TargetFormat,
}

#[derive(Debug, Clone)]
pub struct CompileRequest {
    pub selection: SelectionRequest,
    pub platform: Option<PlatformLimit>,
    pub date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct CompressRequest {
    pub input_dir: PathBuf,
    /// Case-insensitive file name filter
    pub pattern: Option<String>,
}

/// Re-encode `target` into `output` so it joins cleanly with `reference`
#[derive(Debug, Clone)]
pub struct MatchRequest {
    pub reference: PathBuf,
    pub target: PathBuf,
    pub output: PathBuf,
}

#[derive(Debug)]
pub enum MatchOutcome {
    /// Nothing was encoded or written
    AlreadyMatching,
    Converted(BatchReport),
}

/// Result of the hardware probe
#[derive(Debug, Clone)]
pub struct EncoderReport {
    pub hardware_available: bool,
    pub profiles: Vec<EncoderProfile>,
}

/// Interactor for the batch encode use cases
pub struct PipelineInteractor {
    event_port: Arc<dyn EventSourcePort>,
    fs_port: Arc<dyn FsPort>,
    probe_port: Arc<dyn ProbePort>,
    encoders: Arc<EncoderSelector>,
    runner: Arc<dyn JobRunner>,
    config: PipelineConfig,
}

impl PipelineInteractor {
    /// Create new pipeline interactor with injected ports
    pub fn new(
        event_port: Arc<dyn EventSourcePort>,
        fs_port: Arc<dyn FsPort>,
        probe_port: Arc<dyn ProbePort>,
        encoders: Arc<EncoderSelector>,
        runner: Arc<dyn JobRunner>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            event_port,
            fs_port,
            probe_port,
            encoders,
            runner,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn profile_request(&self) -> ProfileRequest {
        ProfileRequest {
            allow_hardware: !self.config.encoder.cpu_only,
        }
    }

    /// The output directory is the one resource a batch cannot run without
    async fn prepare_output_dir(&self) -> Result<(), DomainError> {
        self.fs_port
            .create_directory(&self.config.output.dir)
            .await
    }

    /// Read the sheet and resolve every row; unusable rows land in `rejected`
    async fn select_clips(
        &self,
        request: &SelectionRequest,
        rejected: &mut Vec<RejectedRow>,
    ) -> Result<Vec<SelectedClip>, DomainError> {
        let sheet = self.event_port.read_events(&request.events_path).await?;
        info!(
            "Read {} event rows from {}",
            sheet.rows.len(),
            request.events_path.display()
        );
        rejected.extend(sheet.invalid);

        let mut selector = ClipSelector::new(
            Arc::clone(&self.fs_port),
            Arc::clone(&self.probe_port),
            request.recordings_dir.clone(),
            ClipWindowRule::new(
                self.config.clips.pre_roll_seconds,
                self.config.clips.post_roll_seconds,
            ),
        );

        let mut clips = Vec::with_capacity(sheet.rows.len());
        for row in &sheet.rows {
            match selector.select(row).await {
                Ok((spec, asset)) => clips.push(SelectedClip {
                    line: row.line,
                    spec,
                    asset,
                }),
                Err(e) => {
                    warn!(
                        camera = %row.camera,
                        placement = row.placement,
                        "Row {} rejected: {}",
                        row.line,
                        e
                    );
                    rejected.push(RejectedRow::for_event(row, e.to_string()));
                }
            }
        }
        Ok(clips)
    }

    async fn schedule(
        &self,
        jobs: &[EncodeJob],
        profiles: &[EncoderProfile],
        mut report: BatchReport,
    ) -> BatchReport {
        let mut scheduler = JobScheduler::new(Arc::clone(&self.runner), &self.config.scheduler);
        let batch = scheduler.run(jobs).await;
        report.hardware_encoder = Some(
            profiles
                .iter()
                .any(|profile| profile.kind == EncoderKind::Hardware),
        );
        report.finish(batch.outcomes, batch.retry_successes, batch.retry_failures)
    }

    fn reject_clip(report: &mut BatchReport, clip: &SelectedClip, error: &DomainError) {
        warn!(
            camera = %clip.spec.camera_id,
            placement = clip.spec.placement,
            "Row {} rejected: {}",
            clip.line,
            error
        );
        report.rejected.push(RejectedRow {
            line: clip.line,
            camera: Some(clip.spec.camera_id.clone()),
            placement: Some(clip.spec.placement),
            reason: error.to_string(),
        });
    }

    /// One encoded clip per usable event row
    pub async fn extract(&self, request: SelectionRequest) -> Result<BatchReport, DomainError> {
        let mut report = BatchReport::new("extract", Utc::now());
        self.prepare_output_dir().await?;

        let clips = self.select_clips(&request, &mut report.rejected).await?;
        if clips.is_empty() {
            warn!("No usable event rows, nothing to encode");
            return Ok(report.finish(Vec::new(), 0, 0));
        }

        let profiles = self.encoders.profiles_for(self.profile_request()).await;
        let planner = JobPlanner::new(&self.config);
        let mut jobs = Vec::with_capacity(clips.len());
        for clip in &clips {
            match planner.clip_job(clip, request.format, &profiles) {
                Ok(job) => jobs.push(job),
                Err(e) => Self::reject_clip(&mut report, clip, &e),
            }
        }

        info!("Encoding {} clips as {:?}", jobs.len(), request.format);
        Ok(self.schedule(&jobs, &profiles, report).await)
    }

    /// One compilation of every usable row, optionally split for a platform cap
    pub async fn compile(&self, request: CompileRequest) -> Result<BatchReport, DomainError> {
        let mut report = BatchReport::new("compile", Utc::now());
        self.prepare_output_dir().await?;

        let selected = self
            .select_clips(&request.selection, &mut report.rejected)
            .await?;
        let planner = JobPlanner::new(&self.config);
        let format = request.selection.format;

        // A clip that cannot be framed is dropped rather than sinking the whole compilation
        let mut clips = Vec::with_capacity(selected.len());
        for clip in selected {
            match planner.clip_job(&clip, format, &[]) {
                Ok(_) => clips.push(clip),
                Err(e) => Self::reject_clip(&mut report, &clip, &e),
            }
        }
        if clips.is_empty() {
            warn!("No usable event rows, nothing to compile");
            return Ok(report.finish(Vec::new(), 0, 0));
        }

        let profiles = self.encoders.profiles_for(self.profile_request()).await;
        let jobs =
            planner.compilation_jobs(&clips, format, request.platform, request.date, &profiles)?;
        info!(
            "Compiling {} clips into {} output(s) as {:?}",
            clips.len(),
            jobs.len(),
            format
        );
        Ok(self.schedule(&jobs, &profiles, report).await)
    }

    /// Re-encode every recording in a folder at the configured quality
    pub async fn compress(&self, request: CompressRequest) -> Result<BatchReport, DomainError> {
        let mut report = BatchReport::new("compress", Utc::now());
        self.prepare_output_dir().await?;

        let planner = JobPlanner::new(&self.config);
        let pattern = request.pattern.as_ref().map(|p| p.to_lowercase());
        let candidates: Vec<PathBuf> = self
            .fs_port
            .list_videos(&request.input_dir)
            .await?
            .into_iter()
            .filter(|path| !planner.is_compressed_output(path))
            .filter(|path| match &pattern {
                Some(pattern) => path
                    .file_name()
                    .map(|name| name.to_string_lossy().to_lowercase().contains(pattern))
                    .unwrap_or(false),
                None => true,
            })
            .collect();

        if candidates.is_empty() {
            warn!("No recordings to compress in {}", request.input_dir.display());
            return Ok(report.finish(Vec::new(), 0, 0));
        }

        let profiles = self.encoders.profiles_for(self.profile_request()).await;
        let mut jobs = Vec::with_capacity(candidates.len());
        for (index, path) in candidates.iter().enumerate() {
            let id = index as u32 + 1;
            let job = match self.probe_port.probe(path).await {
                Ok(asset) => planner.compress_job(id, &asset, &profiles),
                Err(e) => Err(e),
            };
            match job {
                Ok(job) => jobs.push(job),
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    report.rejected.push(RejectedRow {
                        line: index + 1,
                        camera: None,
                        placement: None,
                        reason: format!("{}: {}", path.display(), e),
                    });
                }
            }
        }

        info!(
            "Compressing {} recordings at {:?} quality",
            jobs.len(),
            self.config.encoder.quality
        );
        Ok(self.schedule(&jobs, &profiles, report).await)
    }

    /// Probe both recordings and re-encode the target only when its stream
    /// parameters differ from the reference
    pub async fn match_reference(&self, request: MatchRequest) -> Result<MatchOutcome, DomainError> {
        let reference = self.probe_port.probe(&request.reference).await?;
        let target = self.probe_port.probe(&request.target).await?;
        info!(
            "Reference {}: {}x{} {} {:.2} fps {}",
            reference.path.display(),
            reference.width,
            reference.height,
            FormatMatch::codec(&reference),
            reference.framerate,
            FormatMatch::pixel_format(&reference)
        );

        if FormatMatch::matches(&reference, &target) {
            info!("{} already matches the reference", target.path.display());
            return Ok(MatchOutcome::AlreadyMatching);
        }

        let planner = JobPlanner::new(&self.config);
        if let Some(parent) = request.output.parent() {
            if !parent.as_os_str().is_empty() {
                self.fs_port.create_directory(parent).await?;
            }
        }
        let profiles = self.encoders.profiles_for(self.profile_request()).await;
        let job = planner.match_job(&reference, &target, &request.output, &profiles)?;

        let report = BatchReport::new("match", Utc::now());
        Ok(MatchOutcome::Converted(
            self.schedule(&[job], &profiles, report).await,
        ))
    }

    /// Run the hardware probe and report the profile order
    pub async fn probe_encoders(&self) -> EncoderReport {
        let hardware_available = self.encoders.detect_hardware_support().await;
        let profiles = self.encoders.profiles_for(self.profile_request()).await;
        EncoderReport {
            hardware_available,
            profiles,
        }
    }
}
