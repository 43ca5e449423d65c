//! camreel CLI Library
//!
//! Cuts camera event clips from a CSV sheet, reframes them for horizontal or
//! vertical delivery and encodes them through NVENC with an x264 fallback.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod engine;
pub mod output;
pub mod ports;
pub mod utils;

// Re-export commonly used types
pub use domain::errors::{DomainError, DomainResult};
pub use domain::model::{EncodeJob, GeometryRegion, JobOutcome, JobStatus};
pub use domain::settings::PipelineConfig;
