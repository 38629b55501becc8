//! Configuration errors

use thiserror::Error;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration could not be loaded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Invalid config JSON: {0}")]
    InvalidJson(String),

    #[error("Invalid {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Read { .. } => "QDX_CONFIG_READ",
            ConfigError::InvalidJson(_) => "QDX_CONFIG_INVALID_JSON",
            ConfigError::InvalidValue { .. } => "QDX_CONFIG_INVALID_VALUE",
        }
    }
}
