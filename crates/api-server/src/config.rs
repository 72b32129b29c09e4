//! Server configuration
//!
//! Loaded from the YAML file named by `EMOTION_CONFIG` (defaults when unset),
//! then overridden by environment variables.

use anyhow::{Context, Result};
use emotion_analyzers::AnalyzerMode;
use emotion_fusion::FusionConfig;
use emotion_media::MediaConfig;
use emotion_orchestrator::OrchestratorConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_PATH_ENV: &str = "EMOTION_CONFIG";

/// Complete server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on
    pub bind_addr: String,
    /// What to do about analyzers that are not installed
    pub analyzer_mode: AnalyzerMode,
    pub orchestrator: OrchestratorConfig,
    pub media: MediaConfig,
    pub fusion: FusionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            analyzer_mode: AnalyzerMode::default(),
            orchestrator: OrchestratorConfig::default(),
            media: MediaConfig::default(),
            fusion: FusionConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load from `EMOTION_CONFIG` and the process environment
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that parse but cannot be used
    pub fn validate(&self) -> Result<()> {
        self.fusion.validate()?;
        Ok(())
    }

    /// Apply environment overrides, reading variables through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("API_SERVER_ADDR") {
            self.bind_addr = addr;
        }
        if let Some(mode) = lookup("EMOTION_ANALYZER_MODE") {
            self.analyzer_mode = mode
                .parse()
                .with_context(|| format!("Invalid EMOTION_ANALYZER_MODE: {mode}"))?;
        }
        if let Some(max) = lookup("EMOTION_MAX_CONCURRENT_TASKS") {
            self.orchestrator.max_concurrent_tasks = max
                .trim()
                .parse()
                .with_context(|| format!("Invalid EMOTION_MAX_CONCURRENT_TASKS: {max}"))?;
        }
        if let Some(dir) = lookup("EMOTION_SCRATCH_DIR") {
            self.orchestrator.scratch_dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }
}
