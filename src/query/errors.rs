//! Query compilation errors
//!
//! Every variant carries the fragment of query text that caused it. These
//! are user errors: the query could not be parsed or compiled.

use thiserror::Error;

/// Result type for query compilation
pub type ParseResult<T> = Result<T, QueryParseError>;

/// Query could not be parsed or compiled
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryParseError {
    /// Malformed query text
    #[error("Syntax error at position {position}: {message} near `{fragment}`")]
    Syntax {
        position: usize,
        message: String,
        fragment: String,
    },

    /// No operator registered under this name
    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    /// Operator value failed validation
    #[error("Invalid value for {operator}:{value}: {reason}")]
    InvalidValue {
        operator: String,
        value: String,
        reason: String,
    },

    /// Bare term the default field handler cannot interpret
    #[error("unsupported query: `{0}`")]
    UnsupportedQuery(String),

    /// Operator handler failed
    #[error("Error in operator {operator}:{value}: {reason}")]
    OperatorFailed {
        operator: String,
        value: String,
        reason: String,
    },

    /// More index terms than the backend accepts
    #[error("Too many terms in query: {count} exceeds the maximum of {max}")]
    TooManyTerms { count: usize, max: usize },

    /// Rewrite-pattern syntax used in a query
    #[error("Pattern syntax is not allowed in a query: `{0}`")]
    VariableNotAllowed(String),
}

impl QueryParseError {
    pub fn syntax(position: usize, message: impl Into<String>, fragment: impl Into<String>) -> Self {
        QueryParseError::Syntax {
            position,
            message: message.into(),
            fragment: fragment.into(),
        }
    }

    pub fn invalid_value(
        operator: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        QueryParseError::InvalidValue {
            operator: operator.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            QueryParseError::Syntax { .. } => "QDX_QUERY_SYNTAX",
            QueryParseError::UnsupportedOperator(_) => "QDX_UNSUPPORTED_OPERATOR",
            QueryParseError::InvalidValue { .. } => "QDX_INVALID_VALUE",
            QueryParseError::UnsupportedQuery(_) => "QDX_UNSUPPORTED_QUERY",
            QueryParseError::OperatorFailed { .. } => "QDX_OPERATOR_FAILED",
            QueryParseError::TooManyTerms { .. } => "QDX_TOO_MANY_TERMS",
            QueryParseError::VariableNotAllowed(_) => "QDX_PATTERN_IN_QUERY",
        }
    }
}
