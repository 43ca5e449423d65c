//! Multi-clip filter graph synthesis
//!
//! Every input gets its own chain of labeled stages (crop, scale/pad, optional
//! caption). When more than one input feeds an output, a final concat stage
//! joins them in input order, or a chain of crossfades when a transition
//! length is set and every input outlasts it.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::domain::errors::DomainError;
use crate::domain::model::*;

/// Margin between an overlay and the frame edge, in pixels
const OVERLAY_MARGIN: u32 = 24;

/// A complete filter graph with its output labels
#[derive(Debug, Clone, PartialEq)]
pub struct FilterProgram {
    pub graph: String,
    /// Label carrying the final video, without brackets
    pub video_label: String,
    /// Label carrying the final audio, when every input has audio
    pub audio_label: Option<String>,
    /// Number of segments joined by the concat or crossfade stage (1 when there is none)
    pub segment_count: usize,
}

impl FilterProgram {
    /// Inline the graph when short enough, else write it to a script file.
    /// The returned value owns the script; dropping it removes the file.
    pub fn into_invocation(self, inline_limit: usize) -> Result<FilterInvocation, DomainError> {
        if self.graph.len() <= inline_limit {
            return Ok(FilterInvocation::Inline(self));
        }

        let mut script = tempfile::Builder::new()
            .prefix("camreel-graph-")
            .suffix(".txt")
            .tempfile()
            .map_err(|e| DomainError::FsFail(format!("Failed to create filter script: {}", e)))?;
        script
            .write_all(self.graph.as_bytes())
            .and_then(|_| script.flush())
            .map_err(|e| DomainError::FsFail(format!("Failed to write filter script: {}", e)))?;

        debug!(
            "Filter graph of {} bytes written to {}",
            self.graph.len(),
            script.path().display()
        );
        Ok(FilterInvocation::Script { program: self, script })
    }
}

/// How the graph reaches the external tool
#[derive(Debug)]
pub enum FilterInvocation {
    Inline(FilterProgram),
    Script {
        program: FilterProgram,
        script: NamedTempFile,
    },
}

impl FilterInvocation {
    pub fn program(&self) -> &FilterProgram {
        match self {
            FilterInvocation::Inline(program) => program,
            FilterInvocation::Script { program, .. } => program,
        }
    }

    pub fn script_path(&self) -> Option<&Path> {
        match self {
            FilterInvocation::Inline(_) => None,
            FilterInvocation::Script { script, .. } => Some(script.path()),
        }
    }

    /// Graph and stream mapping arguments
    pub fn args(&self) -> Vec<String> {
        let mut args = match self {
            FilterInvocation::Inline(program) => {
                vec!["-filter_complex".to_string(), program.graph.clone()]
            }
            FilterInvocation::Script { script, .. } => vec![
                "-filter_complex_script".to_string(),
                script.path().to_string_lossy().to_string(),
            ],
        };

        let program = self.program();
        args.push("-map".to_string());
        args.push(format!("[{}]", program.video_label));
        if let Some(audio) = &program.audio_label {
            args.push("-map".to_string());
            args.push(format!("[{}]", audio));
        }
        args
    }
}

/// Builds filter programs for the external tool
pub struct FilterGraphBuilder {
    framerate: f64,
    transition_seconds: f64,
}

impl FilterGraphBuilder {
    pub fn new(framerate: f64) -> Self {
        Self {
            framerate,
            transition_seconds: 0.0,
        }
    }

    /// Crossfade between consecutive inputs; 0 keeps hard cuts
    pub fn with_transition(mut self, seconds: f64) -> Self {
        self.transition_seconds = seconds;
        self
    }

    /// Compose per-input stages and, for several inputs, the join stage.
    /// Input `i` of the list must be input `i` of the tool invocation.
    pub fn build(&self, inputs: &[JobInput]) -> Result<FilterProgram, DomainError> {
        if inputs.is_empty() {
            return Err(DomainError::BadArgs(
                "a filter graph needs at least one input".to_string(),
            ));
        }
        if !(self.framerate > 0.0) {
            return Err(DomainError::BadArgs("framerate must be positive".to_string()));
        }

        let with_audio = inputs.iter().all(|input| input.source.has_audio);
        let mut chains = Vec::with_capacity(inputs.len() * 3 + 1);
        let mut segments = Vec::with_capacity(inputs.len());

        for (index, input) in inputs.iter().enumerate() {
            let video_label = self.video_stages(index, input, &mut chains)?;
            let audio_label = if with_audio {
                let label = format!("a{}", index);
                chains.push(format!("[{}:a]asetpts=PTS-STARTPTS[{}]", index, label));
                Some(label)
            } else {
                None
            };
            segments.push((video_label, audio_label));
        }

        let (video_label, audio_label) = if segments.len() == 1 {
            segments.remove(0)
        } else if let Some(fade) = crossfade_seconds(inputs, self.transition_seconds) {
            let durations: Vec<f64> = inputs
                .iter()
                .filter_map(|input| input.source.duration_seconds)
                .collect();
            crossfade_chain(&segments, &durations, fade, &mut chains)
        } else {
            let mut concat = String::new();
            for (video, audio) in &segments {
                concat.push_str(&format!("[{}]", video));
                if let Some(audio) = audio {
                    concat.push_str(&format!("[{}]", audio));
                }
            }
            let audio_streams = if with_audio { 1 } else { 0 };
            concat.push_str(&format!(
                "concat=n={}:v=1:a={}[vout]",
                segments.len(),
                audio_streams
            ));
            if with_audio {
                concat.push_str("[aout]");
            }
            chains.push(concat);
            ("vout".to_string(), with_audio.then(|| "aout".to_string()))
        };

        Ok(FilterProgram {
            graph: chains.join(";"),
            video_label,
            audio_label,
            segment_count: inputs.len(),
        })
    }

    /// crop -> scale(/pad) -> caption; returns the label of the last stage
    fn video_stages(
        &self,
        index: usize,
        input: &JobInput,
        chains: &mut Vec<String>,
    ) -> Result<String, DomainError> {
        let region = &input.region;
        if region.crop_width == 0
            || region.crop_height == 0
            || region.output_width == 0
            || region.output_height == 0
        {
            return Err(DomainError::InvalidGeometry(format!(
                "input {} has an empty region: {:?}",
                index, region
            )));
        }

        let crop_label = format!("c{}", index);
        chains.push(format!(
            "[{}:v]crop={}:{}:{}:{}[{}]",
            index, region.crop_width, region.crop_height, region.crop_x, region.crop_y, crop_label
        ));

        let scale_label = format!("s{}", index);
        let mut scale = format!(
            "[{}]scale={}:{}",
            crop_label, region.output_width, region.output_height
        );
        if region.is_padded() {
            scale.push_str(&format!(
                ",pad={}:{}:{}:{}:black",
                region.canvas_width(),
                region.canvas_height(),
                region.pad_left,
                region.pad_top
            ));
        }
        scale.push_str(&format!(
            ",setsar=1,fps={},setpts=PTS-STARTPTS[{}]",
            rate_arg(self.framerate),
            scale_label
        ));
        chains.push(scale);

        let Some(overlay) = &input.overlay else {
            return Ok(scale_label);
        };

        validate_overlay_text(&overlay.text)?;
        let (x, y) = anchor_position(overlay.anchor);
        let overlay_label = format!("o{}", index);
        chains.push(format!(
            "[{}]drawtext=text={}:expansion=none:fontsize={}:fontcolor=white:box=1:boxcolor=black@0.5:boxborderw=8:x={}:y={}[{}]",
            scale_label, overlay.text, overlay.font_size, x, y, overlay_label
        ));
        Ok(overlay_label)
    }
}

/// Pairwise `xfade`/`acrossfade` stages. Each fade starts `fade` seconds
/// before the running output ends, so output `k` is offset by the summed
/// durations of the first `k` segments minus `k` overlaps.
fn crossfade_chain(
    segments: &[(String, Option<String>)],
    durations: &[f64],
    fade: f64,
    chains: &mut Vec<String>,
) -> (String, Option<String>) {
    let last = segments.len() - 1;
    let label = |k: usize, prefix: &str, end: &str| {
        if k == last {
            end.to_string()
        } else {
            format!("{}{}", prefix, k)
        }
    };

    let (mut video, mut audio) = segments[0].clone();
    let mut elapsed = durations[0];
    for (k, (next_video, next_audio)) in segments.iter().enumerate().skip(1) {
        let offset = elapsed - k as f64 * fade;
        let out = label(k, "xv", "vout");
        chains.push(format!(
            "[{}][{}]xfade=transition=fade:duration={:.3}:offset={:.3}[{}]",
            video, next_video, fade, offset, out
        ));
        video = out;

        if let (Some(current), Some(next)) = (&audio, next_audio) {
            let out = label(k, "xa", "aout");
            chains.push(format!("[{}][{}]acrossfade=d={:.3}[{}]", current, next, fade, out));
            audio = Some(out);
        }
        elapsed += durations[k];
    }
    (video, audio)
}

/// Overlay text must be escaped for the graph parser and then for option parsing
fn validate_overlay_text(text: &str) -> Result<(), DomainError> {
    let option_level = unescape_chars(text, GRAPH_SPECIALS).map_err(|ch| {
        DomainError::MalformedOverlayText(format!(
            "unescaped '{}' at filter graph level in {:?}",
            ch, text
        ))
    })?;
    unescape_chars(&option_level, OPTION_SPECIALS).map_err(|ch| {
        DomainError::MalformedOverlayText(format!(
            "unescaped '{}' at option level in {:?}",
            ch, text
        ))
    })?;
    Ok(())
}

fn anchor_position(anchor: OverlayAnchor) -> (String, String) {
    let m = OVERLAY_MARGIN;
    match anchor {
        OverlayAnchor::TopLeft => (m.to_string(), m.to_string()),
        OverlayAnchor::TopRight => (format!("w-tw-{}", m), m.to_string()),
        OverlayAnchor::BottomLeft => (m.to_string(), format!("h-th-{}", m)),
        OverlayAnchor::BottomRight => (format!("w-tw-{}", m), format!("h-th-{}", m)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn region(padded: bool) -> GeometryRegion {
        GeometryRegion {
            crop_x: 0,
            crop_y: 70,
            crop_width: 1418,
            crop_height: 939,
            output_width: 1080,
            output_height: if padded { 716 } else { 1920 },
            pad_top: if padded { 602 } else { 0 },
            pad_bottom: if padded { 602 } else { 0 },
            pad_left: 0,
            pad_right: 0,
        }
    }

    fn input(name: &str, has_audio: bool, overlay: Option<OverlaySpec>) -> JobInput {
        JobInput {
            source: SourceClipRef {
                path: PathBuf::from(name),
                start_seconds: 10.0,
                duration_seconds: Some(5.0),
                has_audio,
            },
            region: region(false),
            overlay,
        }
    }

    #[test]
    fn test_single_clip_has_no_concat() {
        let program = FilterGraphBuilder::new(30.0)
            .build(&[input("a.mp4", true, None)])
            .unwrap();

        assert_eq!(
            program.graph,
            "[0:v]crop=1418:939:0:70[c0];\
             [c0]scale=1080:1920,setsar=1,fps=30,setpts=PTS-STARTPTS[s0];\
             [0:a]asetpts=PTS-STARTPTS[a0]"
        );
        assert_eq!(program.video_label, "s0");
        assert_eq!(program.audio_label.as_deref(), Some("a0"));
        assert_eq!(program.segment_count, 1);
    }

    #[test]
    fn test_concat_lists_every_clip_in_order() {
        let inputs: Vec<JobInput> = (0..4)
            .map(|i| input(&format!("clip{}.mp4", i), true, None))
            .collect();
        let program = FilterGraphBuilder::new(30.0).build(&inputs).unwrap();

        let concat = program.graph.rsplit(';').next().unwrap();
        assert_eq!(
            concat,
            "[s0][a0][s1][a1][s2][a2][s3][a3]concat=n=4:v=1:a=1[vout][aout]"
        );
        assert_eq!(program.video_label, "vout");
        assert_eq!(program.audio_label.as_deref(), Some("aout"));
        assert_eq!(program.segment_count, 4);
    }

    #[test]
    fn test_labels_are_unique() {
        let inputs: Vec<JobInput> = (0..3)
            .map(|i| {
                input(
                    &format!("clip{}.mp4", i),
                    true,
                    Some(OverlaySpec::caption("cam", OverlayAnchor::TopRight, 30)),
                )
            })
            .collect();
        let program = FilterGraphBuilder::new(30.0).build(&inputs).unwrap();

        let mut produced: Vec<String> = program.graph.split(';').flat_map(output_labels).collect();
        let total = produced.len();
        // crop, scale, caption and audio per clip, plus the two concat outputs
        assert_eq!(total, 3 * 4 + 2);
        produced.sort();
        produced.dedup();
        assert_eq!(produced.len(), total);
    }

    fn output_labels(chain: &str) -> Vec<String> {
        let mut rest = chain;
        let mut labels = Vec::new();
        while let Some(stripped) = rest.strip_suffix(']') {
            let open = stripped.rfind('[').unwrap();
            labels.push(stripped[open + 1..].to_string());
            rest = &stripped[..open];
        }
        labels
    }

    #[test]
    fn test_audio_dropped_when_any_clip_is_silent() {
        let program = FilterGraphBuilder::new(25.0)
            .build(&[input("a.mp4", true, None), input("b.mp4", false, None)])
            .unwrap();

        assert!(!program.graph.contains(":a]"));
        assert!(program.graph.ends_with("[s0][s1]concat=n=2:v=1:a=0[vout]"));
        assert_eq!(program.audio_label, None);
    }

    #[test]
    fn test_crossfade_chain_offsets_by_running_length() {
        let mut inputs: Vec<JobInput> = (0..3)
            .map(|i| input(&format!("clip{}.mp4", i), true, None))
            .collect();
        inputs[1].source.duration_seconds = Some(4.0);
        let program = FilterGraphBuilder::new(30.0)
            .with_transition(0.5)
            .build(&inputs)
            .unwrap();

        let joins: Vec<&str> = program.graph.split(';').skip(9).collect();
        assert_eq!(
            joins,
            vec![
                "[s0][s1]xfade=transition=fade:duration=0.500:offset=4.500[xv1]",
                "[a0][a1]acrossfade=d=0.500[xa1]",
                "[xv1][s2]xfade=transition=fade:duration=0.500:offset=8.000[vout]",
                "[xa1][a2]acrossfade=d=0.500[aout]",
            ]
        );
        assert!(!program.graph.contains("concat="));
        assert_eq!(program.video_label, "vout");
        assert_eq!(program.audio_label.as_deref(), Some("aout"));
        assert_eq!(program.segment_count, 3);
    }

    #[test]
    fn test_transition_longer_than_a_clip_falls_back_to_concat() {
        let mut inputs = vec![input("a.mp4", false, None), input("b.mp4", false, None)];
        inputs[1].source.duration_seconds = Some(0.4);
        let program = FilterGraphBuilder::new(30.0)
            .with_transition(0.5)
            .build(&inputs)
            .unwrap();
        assert!(program.graph.ends_with("[s0][s1]concat=n=2:v=1:a=0[vout]"));
    }

    #[test]
    fn test_fractional_framerate_is_trimmed() {
        let program = FilterGraphBuilder::new(29.97)
            .build(&[input("a.mp4", false, None)])
            .unwrap();
        assert!(program.graph.contains(",fps=29.97,"));
    }

    #[test]
    fn test_letterbox_region_adds_pad_stage() {
        let mut clip = input("a.mp4", false, None);
        clip.region = region(true);
        let program = FilterGraphBuilder::new(30.0).build(&[clip]).unwrap();
        assert!(program
            .graph
            .contains("[c0]scale=1080:716,pad=1080:1920:0:602:black,setsar=1"));
    }

    #[test]
    fn test_side_bars_offset_pad_horizontally() {
        let mut clip = input("a.mp4", false, None);
        clip.region = GeometryRegion {
            output_width: 480,
            output_height: 1920,
            pad_top: 0,
            pad_bottom: 0,
            pad_left: 300,
            pad_right: 300,
            ..region(false)
        };
        let program = FilterGraphBuilder::new(30.0).build(&[clip]).unwrap();
        assert!(program
            .graph
            .contains("[c0]scale=480:1920,pad=1080:1920:300:0:black,setsar=1"));
    }

    #[test]
    fn test_caption_stage_follows_scale() {
        let overlay = OverlaySpec::caption("Gate: #3", OverlayAnchor::BottomLeft, 36);
        let program = FilterGraphBuilder::new(30.0)
            .build(&[input("a.mp4", false, Some(overlay))])
            .unwrap();

        assert!(program.graph.contains(
            "[s0]drawtext=text=Gate\\\\: #3:expansion=none:fontsize=36"
        ));
        assert!(program.graph.contains("x=24:y=h-th-24[o0]"));
        assert_eq!(program.video_label, "o0");
    }

    #[test]
    fn test_unescaped_overlay_is_rejected() {
        for text in ["a,b", "a:b", "end\\", "it's"] {
            let overlay = OverlaySpec {
                text: text.to_string(),
                anchor: OverlayAnchor::TopLeft,
                font_size: 20,
            };
            let result = FilterGraphBuilder::new(30.0).build(&[input("a.mp4", false, Some(overlay))]);
            assert!(
                matches!(result, Err(DomainError::MalformedOverlayText(_))),
                "{:?} was accepted",
                text
            );
        }
    }

    #[test]
    fn test_empty_inputs_rejected() {
        assert!(FilterGraphBuilder::new(30.0).build(&[]).is_err());
    }

    #[test]
    fn test_long_graph_goes_to_script_and_is_removed_on_drop() {
        let inputs: Vec<JobInput> = (0..8)
            .map(|i| input(&format!("clip{}.mp4", i), true, None))
            .collect();
        let program = FilterGraphBuilder::new(30.0).build(&inputs).unwrap();
        let graph = program.graph.clone();

        let invocation = program.into_invocation(64).unwrap();
        let path = invocation.script_path().unwrap().to_path_buf();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), graph);

        let args = invocation.args();
        assert_eq!(args[0], "-filter_complex_script");
        assert_eq!(&args[2..], ["-map", "[vout]", "-map", "[aout]"]);

        drop(invocation);
        assert!(!path.exists());
    }

    #[test]
    fn test_short_graph_stays_inline() {
        let program = FilterGraphBuilder::new(30.0)
            .build(&[input("a.mp4", false, None)])
            .unwrap();
        let invocation = program.into_invocation(4096).unwrap();
        assert!(invocation.script_path().is_none());
        assert_eq!(invocation.args()[0], "-filter_complex");
        assert_eq!(&invocation.args()[2..], ["-map", "[s0]"]);
    }
}
