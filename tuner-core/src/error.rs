//! Error types for the tuner core.
//!
//! The signal path itself never fails; errors only arise while loading
//! or validating an [`EngineConfig`](crate::config::EngineConfig).

use thiserror::Error;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while loading, saving or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the configuration file failed.
    #[error("config file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid JSON for `EngineConfig`.
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field holds a value the engine cannot work with.
    #[error("invalid config field '{field}': {reason}")]
    Invalid {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}
