//! Hardware capability detection and encoder profile ordering

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::domain::model::{EncoderKind, EncoderProfile};
use crate::domain::settings::EncoderSettings;
use crate::ports::MediaToolPort;

/// What a caller wants from the encoder list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileRequest {
    pub allow_hardware: bool,
}

impl Default for ProfileRequest {
    fn default() -> Self {
        Self {
            allow_hardware: true,
        }
    }
}

/// Probes the media tool once and hands out ordered encoder profiles
pub struct EncoderSelector {
    tool: Arc<dyn MediaToolPort>,
    hardware: EncoderProfile,
    software: EncoderProfile,
    hardware_detected: OnceCell<bool>,
}

impl EncoderSelector {
    pub fn new(tool: Arc<dyn MediaToolPort>, settings: &EncoderSettings) -> Self {
        Self {
            tool,
            hardware: Self::hardware_profile(settings),
            software: Self::software_profile(settings),
            hardware_detected: OnceCell::new(),
        }
    }

    /// NVENC variable-rate constant-quality parameters
    pub fn hardware_profile(settings: &EncoderSettings) -> EncoderProfile {
        let cq = settings.effective_cq();
        let pairs = [
            ("-preset", settings.quality.nvenc_preset().to_string()),
            ("-rc", "vbr".to_string()),
            ("-cq", cq.to_string()),
            ("-b:v", "0".to_string()),
            ("-maxrate", settings.max_bitrate.clone()),
            ("-bufsize", settings.buffer_size.clone()),
            ("-bf", "3".to_string()),
            ("-g", "250".to_string()),
            ("-profile:v", "high".to_string()),
            ("-pix_fmt", "yuv420p".to_string()),
        ];
        EncoderProfile {
            kind: EncoderKind::Hardware,
            codec_name: settings.hardware_codec.clone(),
            rate_control: pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            quality_level: cq,
        }
    }

    /// x264 constant-rate-factor parameters
    pub fn software_profile(settings: &EncoderSettings) -> EncoderProfile {
        let crf = settings.software_crf();
        let pairs = [
            ("-preset", settings.software_preset.clone()),
            ("-crf", crf.to_string()),
            ("-threads", settings.threads.max(1).to_string()),
            ("-profile:v", "high".to_string()),
            ("-pix_fmt", "yuv420p".to_string()),
        ];
        EncoderProfile {
            kind: EncoderKind::Software,
            codec_name: settings.software_codec.clone(),
            rate_control: pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            quality_level: crf,
        }
    }

    /// Probe the encoder listing on first call; later calls reuse the answer.
    /// A failed probe is logged once and counts as no hardware.
    pub async fn detect_hardware_support(&self) -> bool {
        *self
            .hardware_detected
            .get_or_init(|| async {
                let codec = self.hardware.codec_name.as_str();
                match self.tool.list_encoders().await {
                    Ok(listing) => {
                        let found = listing.split_whitespace().any(|token| token == codec);
                        if found {
                            info!("Hardware encoder {} available", codec);
                        } else {
                            info!("Hardware encoder {} not listed, using software encoding", codec);
                        }
                        found
                    }
                    Err(e) => {
                        warn!("{}; falling back to software encoding for this run", e);
                        false
                    }
                }
            })
            .await
    }

    /// `[hardware, software]` when hardware is usable, else `[software]`
    pub async fn profiles_for(&self, request: ProfileRequest) -> Vec<EncoderProfile> {
        if request.allow_hardware && self.detect_hardware_support().await {
            vec![self.hardware.clone(), self.software.clone()]
        } else {
            vec![self.software.clone()]
        }
    }
}
