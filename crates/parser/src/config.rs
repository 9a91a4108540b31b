use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::registry::PatternSpec;
use crate::rules::CategoryRule;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("similarity_threshold must be within 0.0..=1.0, got {0}")]
    Threshold(f32),
    #[error("date_window_days must not be negative, got {0}")]
    DateWindow(i64),
}

/// Optional caps on a single run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseLimits {
    pub max_input_bytes: Option<usize>,
    pub max_segments: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    pub date_window_days: i64,
    pub similarity_threshold: f32,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            date_window_days: 3,
            similarity_threshold: 0.7,
        }
    }
}

/// Everything a host can tune. Every section may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub limits: ParseLimits,
    /// Extra patterns, tried after the built-in ones of the same provider.
    pub patterns: Vec<PatternSpec>,
    pub category_rules: Vec<CategoryRule>,
    pub dedup: DedupConfig,
}

impl EngineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let t = self.dedup.similarity_threshold;
        if !(0.0..=1.0).contains(&t) {
            return Err(ConfigError::Threshold(t));
        }
        if self.dedup.date_window_days < 0 {
            return Err(ConfigError::DateWindow(self.dedup.date_window_days));
        }
        Ok(())
    }
}
