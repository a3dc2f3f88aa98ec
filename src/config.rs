//! Worker pool settings for concurrent evaluation.

use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const WORKERS_ENV: &str = "LAZY_PIPELINE_WORKERS";
pub const PARTITION_SIZE_ENV: &str = "LAZY_PIPELINE_PARTITION_SIZE";

const DEFAULT_PARTITION_SIZE: usize = 1024;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("failed to parse config: {message}")]
    ParseError { message: String },

    #[error("invalid value '{value}' for '{field}': {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("value {value} for '{field}' is out of range (min: {min})")]
    OutOfRange { field: String, value: usize, min: usize },
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError {
            message: err.to_string(),
        }
    }
}

/// How the concurrent evaluator splits and schedules work.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Requested size of the fixed worker pool, and the cap on partitions in
    /// flight. The pool never grows past the machine's available parallelism.
    pub workers: usize,
    /// Elements per partition pulled from the source.
    pub partition_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get().max(1),
            partition_size: DEFAULT_PARTITION_SIZE,
        }
    }
}

impl PipelineConfig {
    pub fn new(workers: usize, partition_size: usize) -> Result<Self, ConfigError> {
        let config = Self {
            workers,
            partition_size,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|err| ConfigError::ParseError {
            message: format!("failed to read {}: {err}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Defaults overridden by `LAZY_PIPELINE_WORKERS` / `LAZY_PIPELINE_PARTITION_SIZE`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|key| env::var(key).ok())
    }

    fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(raw) = lookup(WORKERS_ENV) {
            self.workers = parse_count(WORKERS_ENV, &raw)?;
        }
        if let Some(raw) = lookup(PARTITION_SIZE_ENV) {
            self.partition_size = parse_count(PARTITION_SIZE_ENV, &raw)?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers < 1 {
            return Err(ConfigError::OutOfRange {
                field: "workers".into(),
                value: self.workers,
                min: 1,
            });
        }
        if self.partition_size < 1 {
            return Err(ConfigError::OutOfRange {
                field: "partition_size".into(),
                value: self.partition_size,
                min: 1,
            });
        }
        Ok(())
    }
}

fn parse_count(field: &str, raw: &str) -> Result<usize, ConfigError> {
    raw.trim()
        .parse::<usize>()
        .map_err(|err| ConfigError::InvalidValue {
            field: field.to_string(),
            value: raw.to_string(),
            reason: err.to_string(),
        })
}
