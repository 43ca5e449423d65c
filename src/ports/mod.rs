// Ports - Interface definitions (contracts)

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::settings::PipelineConfig;

/// Result of one external tool invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ToolExit {
    /// `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub success: bool,
    /// Last diagnostic lines, oldest first
    pub stderr_tail: Vec<String>,
}

impl ToolExit {
    pub fn succeeded() -> Self {
        Self {
            code: Some(0),
            success: true,
            stderr_tail: Vec::new(),
        }
    }

    pub fn failed(code: Option<i32>, stderr_tail: Vec<String>) -> Self {
        Self {
            code,
            success: false,
            stderr_tail,
        }
    }
}

/// Port for the external media tool (decode/filter/encode)
#[async_trait]
pub trait MediaToolPort: Send + Sync {
    /// Capability listing of available encoders
    async fn list_encoders(&self) -> Result<String, DomainError>;

    /// Run with the given arguments, feeding every diagnostic line to `on_line`.
    /// Spawn failures are errors; a non-zero exit is reported through `ToolExit`.
    async fn run(
        &self,
        args: &[String],
        on_line: &mut (dyn for<'l> FnMut(&'l str) + Send),
    ) -> Result<ToolExit, DomainError>;
}

/// Port for media file probing
#[async_trait]
pub trait ProbePort: Send + Sync {
    /// Probe dimensions, duration, frame rate and audio presence
    async fn probe(&self, path: &Path) -> Result<SourceAsset, DomainError>;
}

/// Port for file system operations
#[async_trait]
pub trait FsPort: Send + Sync {
    /// Size of a file, `None` when it does not exist
    async fn file_size(&self, path: &Path) -> Result<Option<u64>, DomainError>;

    /// Create directory (including parent directories)
    async fn create_directory(&self, path: &Path) -> Result<(), DomainError>;

    /// Delete a file; a missing file is not an error
    async fn remove_file(&self, path: &Path) -> Result<(), DomainError>;

    /// Video files directly inside `folder`, sorted by name
    async fn list_videos(&self, folder: &Path) -> Result<Vec<PathBuf>, DomainError>;
}

/// Port for the tabular event source
#[async_trait]
pub trait EventSourcePort: Send + Sync {
    async fn read_events(&self, path: &Path) -> Result<EventSheet, DomainError>;
}

/// Port for configuration management
#[async_trait]
pub trait ConfigPort: Send + Sync {
    /// Load from `explicit` when given, else from the first existing search path, else defaults
    async fn load_config(&self, explicit: Option<&Path>) -> Result<PipelineConfig, DomainError>;

    /// Files consulted when no explicit path is given
    fn search_paths(&self) -> Vec<PathBuf>;
}
