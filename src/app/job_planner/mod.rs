// Job planner - Turns selected clips into encode jobs

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::debug;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::*;
use crate::domain::settings::*;

/// A windowed event together with the recording it is cut from
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedClip {
    /// Event sheet line the clip came from
    pub line: usize,
    pub spec: ClipSpec,
    pub asset: SourceAsset,
}

/// Framing and naming choices shared by every job of a run
#[derive(Debug, Clone)]
pub struct JobPlanner {
    clips: ClipSettings,
    horizontal: FrameSettings,
    vertical: VerticalSettings,
    output_dir: PathBuf,
    compress_suffix: String,
    framerate: f64,
    audio_bitrate: String,
}

impl JobPlanner {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            clips: config.clips.clone(),
            horizontal: config.horizontal.clone(),
            vertical: config.vertical.clone(),
            output_dir: config.output.dir.clone(),
            compress_suffix: config.output.compress_suffix.clone(),
            framerate: f64::from(config.encoder.framerate),
            audio_bitrate: config.encoder.quality.audio_bitrate().to_string(),
        }
    }

    /// Target frame and geometry mode for a format. `reference` sizes the
    /// source-format frame so every input of a compilation matches.
    pub fn framing(
        &self,
        format: TargetFormat,
        reference: &SourceAsset,
    ) -> (Resolution, GeometryMode) {
        match format {
            TargetFormat::Source => (
                Resolution::new(even(reference.width), even(reference.height)),
                GeometryMode::FullFrame,
            ),
            TargetFormat::Horizontal => (
                self.horizontal.resolution(),
                GeometryMode::ZoomStretch {
                    zoom: self.horizontal.zoom,
                    trim: self.horizontal.trim,
                },
            ),
            TargetFormat::Vertical => {
                let frame = self.vertical.frame();
                let mode = match self.vertical.fit {
                    VerticalFit::Zoom => GeometryMode::ZoomStretch {
                        zoom: frame.zoom,
                        trim: frame.trim,
                    },
                    VerticalFit::Letterbox => GeometryMode::Letterbox {
                        zoom: frame.zoom,
                        trim: frame.trim,
                    },
                    VerticalFit::Fill => GeometryMode::Fill,
                };
                (frame.resolution(), mode)
            }
        }
    }

    /// `"<camera> #<placement> @ <HH:MM:SS.mmm>"`
    pub fn caption_text(spec: &ClipSpec) -> String {
        format!(
            "{} #{} @ {}",
            spec.camera_id,
            spec.placement,
            TimeSpec::from_seconds(spec.event_timestamp).format_hms()
        )
    }

    fn job_input(
        &self,
        clip: &SelectedClip,
        format: TargetFormat,
        reference: &SourceAsset,
    ) -> Result<JobInput, DomainError> {
        let (target, mode) = self.framing(format, reference);
        let region = GeometryEngine::compute_region(
            clip.asset.width,
            clip.asset.height,
            target.width,
            target.height,
            clip.spec.side,
            mode,
        )?;
        let overlay = self.clips.caption.then(|| {
            OverlaySpec::caption(
                &Self::caption_text(&clip.spec),
                OverlayAnchor::BottomLeft,
                self.clips.caption_font_size,
            )
        });

        Ok(JobInput {
            source: SourceClipRef {
                path: clip.asset.path.clone(),
                start_seconds: clip.spec.window_start,
                duration_seconds: Some(clip.spec.duration()),
                has_audio: clip.asset.has_audio,
            },
            region,
            overlay,
        })
    }

    fn job(
        &self,
        id: u32,
        label: String,
        inputs: Vec<JobInput>,
        file_name: String,
        profiles: &[EncoderProfile],
    ) -> EncodeJob {
        EncodeJob {
            id,
            label,
            inputs,
            output_path: self.output_dir.join(file_name),
            profiles: profiles.to_vec(),
            framerate: self.framerate,
            audio_bitrate: self.audio_bitrate.clone(),
            transition_seconds: 0.0,
            pixel_format: None,
        }
    }

    /// One single-input job for an event clip, identified by its placement
    pub fn clip_job(
        &self,
        clip: &SelectedClip,
        format: TargetFormat,
        profiles: &[EncoderProfile],
    ) -> Result<EncodeJob, DomainError> {
        let input = self.job_input(clip, format, &clip.asset)?;
        let stem = file_stem(&clip.asset.path);
        let file_name = OutputNaming::clip_file_name(
            &stem,
            &clip.spec.camera_id,
            clip.spec.placement,
            clip.spec.event_timestamp,
            format,
        );
        let label = format!("{} #{}", clip.spec.camera_id, clip.spec.placement);
        Ok(self.job(clip.spec.placement, label, vec![input], file_name, profiles))
    }

    /// Compilation jobs in placement order: one job, or one per platform part
    pub fn compilation_jobs(
        &self,
        clips: &[SelectedClip],
        format: TargetFormat,
        platform: Option<PlatformLimit>,
        date: NaiveDate,
        profiles: &[EncoderProfile],
    ) -> Result<Vec<EncodeJob>, DomainError> {
        let mut ordered: Vec<&SelectedClip> = clips.iter().collect();
        ordered.sort_by_key(|clip| clip.spec.placement);
        let reference = match ordered.first() {
            Some(first) => &first.asset,
            None => return Ok(Vec::new()),
        };

        let inputs = ordered
            .iter()
            .map(|clip| self.job_input(clip, format, reference))
            .collect::<Result<Vec<_>, _>>()?;

        let Some(platform) = platform else {
            let file_name =
                OutputNaming::compilation_file_name(format, &date.format("%Y-%m-%d").to_string());
            let label = format!("compilation ({} clips)", inputs.len());
            let job = self.job(1, label, inputs, file_name, profiles);
            return Ok(vec![self.with_transition(job)]);
        };

        let durations: Vec<f64> = ordered.iter().map(|clip| clip.spec.duration()).collect();
        let compact_date = date.format("%Y%m%d").to_string();
        let parts = platform.split_parts(&durations);
        debug!(
            "Splitting {} clips into {} parts for {}",
            ordered.len(),
            parts.len(),
            platform.slug()
        );

        Ok(parts
            .into_iter()
            .enumerate()
            .map(|(index, range)| {
                let part = index + 1;
                let file_name = OutputNaming::platform_part_file_name(platform, part, &compact_date);
                let label = format!("{} part {} ({} clips)", platform.slug(), part, range.len());
                let job = self.job(part as u32, label, inputs[range].to_vec(), file_name, profiles);
                self.with_transition(job)
            })
            .collect())
    }

    fn with_transition(&self, job: EncodeJob) -> EncodeJob {
        EncodeJob {
            transition_seconds: self.clips.transition_seconds,
            ..job
        }
    }

    /// Re-encode of a whole recording at its own frame size
    pub fn compress_job(
        &self,
        id: u32,
        asset: &SourceAsset,
        profiles: &[EncoderProfile],
    ) -> Result<EncodeJob, DomainError> {
        let region = GeometryEngine::compute_region(
            asset.width,
            asset.height,
            even(asset.width),
            even(asset.height),
            Side::Center,
            GeometryMode::FullFrame,
        )?;
        let input = JobInput {
            source: SourceClipRef {
                path: asset.path.clone(),
                start_seconds: 0.0,
                duration_seconds: None,
                has_audio: asset.has_audio,
            },
            region,
            overlay: None,
        };
        let stem = file_stem(&asset.path);
        let file_name = OutputNaming::compressed_file_name(&stem, &self.compress_suffix);
        Ok(self.job(id, stem, vec![input], file_name, profiles))
    }

    /// Re-encode of `target` at the reference's frame size, rate and pixel
    /// format. Only h264 references can be matched by the encoder profiles.
    pub fn match_job(
        &self,
        reference: &SourceAsset,
        target: &SourceAsset,
        output_path: &Path,
        profiles: &[EncoderProfile],
    ) -> Result<EncodeJob, DomainError> {
        let codec = FormatMatch::codec(reference);
        if codec != "h264" {
            return Err(DomainError::BadArgs(format!(
                "{} is {}; only h264 references can be matched",
                reference.path.display(),
                codec
            )));
        }
        let region = GeometryEngine::compute_region(
            target.width,
            target.height,
            even(reference.width),
            even(reference.height),
            Side::Center,
            GeometryMode::FullFrame,
        )?;
        let input = JobInput {
            source: SourceClipRef {
                path: target.path.clone(),
                start_seconds: 0.0,
                duration_seconds: None,
                has_audio: target.has_audio,
            },
            region,
            overlay: None,
        };

        Ok(EncodeJob {
            id: 1,
            label: file_stem(&target.path),
            inputs: vec![input],
            output_path: output_path.to_path_buf(),
            profiles: profiles.to_vec(),
            framerate: reference.framerate,
            audio_bitrate: self.audio_bitrate.clone(),
            transition_seconds: 0.0,
            pixel_format: Some(FormatMatch::pixel_format(reference)),
        })
    }

    /// Inputs that already carry the compression suffix are outputs of an earlier run
    pub fn is_compressed_output(&self, path: &Path) -> bool {
        let marker = format!("-{}.", self.compress_suffix.to_lowercase());
        path.file_name()
            .map(|name| name.to_string_lossy().to_lowercase().contains(&marker))
            .unwrap_or(false)
    }
}

/// Encoders want even frame dimensions
fn even(value: u32) -> u32 {
    (value & !1).max(2)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "recording".to_string())
}
