use std::sync::Arc;
use std::time::Duration;

use crate::adapters::{CsvEventSource, FFmpegAdapter, FFprobeAdapter, FsLocalAdapter};
use crate::app::pipeline_interactor::PipelineInteractor;
use crate::domain::settings::PipelineConfig;
use crate::engine::{EncodeOrchestrator, EncoderSelector, JobRunner, ProgressCallback};
use crate::ports::{EventSourcePort, FsPort, MediaToolPort, ProbePort};

pub trait AppContainer: Send + Sync {
    fn pipeline_interactor(&self) -> Arc<PipelineInteractor>;
}

/// Wires the host adapters around one encoder selector per run
pub struct DefaultAppContainer {
    pipeline_interactor: Arc<PipelineInteractor>,
}

impl DefaultAppContainer {
    pub fn new(config: PipelineConfig, progress: Arc<dyn ProgressCallback>) -> Self {
        let probe_timeout = Duration::from_secs(config.tools.probe_timeout_secs);
        let media_tool: Arc<dyn MediaToolPort> =
            Arc::new(FFmpegAdapter::new(config.tools.ffmpeg.clone(), probe_timeout));
        let probe_port: Arc<dyn ProbePort> = Arc::new(FFprobeAdapter::new(
            config.tools.ffprobe.clone(),
            probe_timeout,
        ));
        let fs_port: Arc<dyn FsPort> = Arc::new(FsLocalAdapter::new());
        let event_port: Arc<dyn EventSourcePort> = Arc::new(CsvEventSource::new());

        Self::with_ports(config, media_tool, probe_port, fs_port, event_port, progress)
    }

    /// Build around caller-supplied ports
    pub fn with_ports(
        config: PipelineConfig,
        media_tool: Arc<dyn MediaToolPort>,
        probe_port: Arc<dyn ProbePort>,
        fs_port: Arc<dyn FsPort>,
        event_port: Arc<dyn EventSourcePort>,
        progress: Arc<dyn ProgressCallback>,
    ) -> Self {
        let encoders = Arc::new(EncoderSelector::new(
            Arc::clone(&media_tool),
            &config.encoder,
        ));
        let runner: Arc<dyn JobRunner> = Arc::new(EncodeOrchestrator::new(
            media_tool,
            Arc::clone(&fs_port),
            progress,
            config.output.inline_filter_limit,
        ));

        let pipeline_interactor = Arc::new(PipelineInteractor::new(
            event_port,
            fs_port,
            probe_port,
            encoders,
            runner,
            config,
        ));

        Self {
            pipeline_interactor,
        }
    }
}

impl AppContainer for DefaultAppContainer {
    fn pipeline_interactor(&self) -> Arc<PipelineInteractor> {
        Arc::clone(&self.pipeline_interactor)
    }
}
