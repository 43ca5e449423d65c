// Application layer - Use case interactors

pub mod clip_selector;
pub mod container;
pub mod job_planner;
pub mod pipeline_interactor;
pub mod scheduler;

// Re-export interactors
pub use clip_selector::ClipSelector;
pub use container::{AppContainer, DefaultAppContainer};
pub use job_planner::{JobPlanner, SelectedClip};
pub use pipeline_interactor::{
    CompileRequest, CompressRequest, EncoderReport, MatchOutcome, MatchRequest,
    PipelineInteractor, SelectionRequest,
};
pub use scheduler::{JobScheduler, ScheduledBatch};
