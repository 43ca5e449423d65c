//! Encode pipeline engine
//!
//! Filter graph synthesis, encoder selection with hardware fallback, and the
//! per-job attempt state machine.

pub mod encoder;
pub mod filter_graph;
pub mod orchestrator;
pub mod progress;

pub use encoder::{EncoderSelector, ProfileRequest};
pub use filter_graph::{FilterGraphBuilder, FilterInvocation, FilterProgram};
pub use orchestrator::{AttemptState, EncodeOrchestrator, JobRunner};
pub use progress::{
    ConsoleProgressCallback, JsonProgressCallback, NoOpProgressCallback, ProgressCallback,
    ProgressTracker,
};
