//! CLI-specific error types
//!
//! Every CLI error ends the process with a non-zero status.

use std::fmt;
use std::io;

use crate::config::ConfigError;
use crate::error::EngineError;
use crate::query::QueryParseError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (files, stdout)
    IoError,
    /// Change file could not be read as changes
    InputError,
    /// Query failed to compile or run
    QueryError,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "QDX_CLI_CONFIG_ERROR",
            Self::IoError => "QDX_CLI_IO_ERROR",
            Self::InputError => "QDX_CLI_INPUT_ERROR",
            Self::QueryError => "QDX_CLI_QUERY_ERROR",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn input_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InputError, msg)
    }

    pub fn query_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::QueryError, msg)
    }

    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::config_error(format!("{} ({})", e, e.code()))
    }
}

impl From<EngineError> for CliError {
    fn from(e: EngineError) -> Self {
        Self::query_error(format!("{} ({})", e, e.code()))
    }
}

impl From<QueryParseError> for CliError {
    fn from(e: QueryParseError) -> Self {
        Self::query_error(format!("{} ({})", e, e.code()))
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
