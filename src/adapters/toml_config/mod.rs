// TOML config adapter - Configuration management using TOML (or YAML) files

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::domain::errors::*;
use crate::domain::settings::PipelineConfig;
use crate::ports::*;

/// File-backed configuration adapter
#[derive(Debug, Clone)]
pub struct TomlConfigAdapter {
    search_paths: Vec<PathBuf>,
}

impl Default for TomlConfigAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl TomlConfigAdapter {
    /// Searches `camreel.toml` then `config/camreel.toml` in the working directory
    pub fn new() -> Self {
        Self::with_search_paths(vec![
            PathBuf::from("camreel.toml"),
            PathBuf::from("config").join("camreel.toml"),
        ])
    }

    pub fn with_search_paths(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    /// Parse by extension: `.yaml`/`.yml` as YAML, anything else as TOML
    pub fn parse(path: &Path, content: &str) -> Result<PipelineConfig, DomainError> {
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
            .unwrap_or(false);

        if is_yaml {
            serde_yaml::from_str(content).map_err(|e| {
                DomainError::Config(format!("Failed to parse {}: {}", path.display(), e))
            })
        } else {
            toml::from_str(content).map_err(|e| {
                DomainError::Config(format!("Failed to parse {}: {}", path.display(), e))
            })
        }
    }

    async fn read(path: &Path) -> Result<PipelineConfig, DomainError> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            DomainError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config = Self::parse(path, &content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

#[async_trait]
impl ConfigPort for TomlConfigAdapter {
    async fn load_config(&self, explicit: Option<&Path>) -> Result<PipelineConfig, DomainError> {
        if let Some(path) = explicit {
            return Self::read(path).await;
        }

        for candidate in &self.search_paths {
            if tokio::fs::try_exists(candidate).await.unwrap_or(false) {
                return Self::read(candidate).await;
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(PipelineConfig::default())
    }

    fn search_paths(&self) -> Vec<PathBuf> {
        self.search_paths.clone()
    }
}
