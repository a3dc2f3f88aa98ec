use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised while building or evaluating a pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The source behind this view was already handed to a terminal operation
    /// (or moved into a downstream pipeline by `map_into`).
    #[error("pipeline has already been operated upon or closed")]
    Consumed,

    #[error("duplicate key {key} while collecting into a map")]
    DuplicateKey { key: String },

    #[error("`{operation}` needs encounter order and is not defined for a parallel pipeline")]
    Unordered { operation: &'static str },

    #[error("failed to start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("failed to open source: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl PipelineError {
    pub fn duplicate_key(key: impl std::fmt::Debug) -> Self {
        Self::DuplicateKey {
            key: format!("{key:?}"),
        }
    }

    pub fn is_consumed(&self) -> bool {
        matches!(self, Self::Consumed)
    }
}

/// Errors from the date/time helpers in [`crate::temporal`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemporalError {
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("unknown time-zone id: {0}")]
    UnknownZone(String),

    #[error("invalid format pattern '{0}'")]
    InvalidPattern(String),

    #[error("text '{input}' could not be parsed with pattern '{pattern}': {reason}")]
    Parse {
        input: String,
        pattern: String,
        reason: String,
    },
}

impl TemporalError {
    pub fn invalid_value(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
