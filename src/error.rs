//! # Engine Errors
//!
//! Crate-wide error type for everything that happens after a query has been
//! compiled: rewriting, source composition, index reads and result
//! materialization.

use thiserror::Error;

use crate::observability::Severity;
use crate::query::QueryParseError;
use crate::rewrite::RewriteError;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    // ==================
    // Query Errors
    // ==================
    /// Query text or predicate could not be compiled
    #[error("{0}")]
    Parse(#[from] QueryParseError),

    /// A rewrite rule failed
    #[error("{0}")]
    Rewrite(#[from] RewriteError),

    // ==================
    // Source Errors
    // ==================
    /// Index backend failed while reading
    #[error("Storage failure: {0}")]
    Storage(String),

    /// Predicate has no index-backed part to read from
    #[error("No data source: {0}")]
    NoDataSource(String),

    // ==================
    // Misuse Errors
    // ==================
    /// A predicate node was built with the wrong shape
    #[error("Invalid predicate: {0}")]
    InvalidPredicate(String),

    /// `matches` called on a node that cannot evaluate in memory
    #[error("Predicate cannot be matched in memory: {0}")]
    NotMatchable(String),

    /// A one-shot query processor was used twice
    #[error("Query processor has already been used")]
    ProcessorReused,

    /// Pagination or limit options are inconsistent
    #[error("Invalid query options: {0}")]
    InvalidOptions(String),

    /// A field was requested that the schema does not store
    #[error("Field is not stored: {0}")]
    FieldNotStored(String),

    /// A non-repeatable field did not hold exactly one value
    #[error("Field {field} holds {count} values, expected exactly one")]
    FieldCardinality { field: String, count: usize },

    /// A cardinal predicate was built over a child without cardinality
    #[error("Predicate has no cardinality: {0}")]
    Cardinality(String),

    /// The operation is not offered by this source
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl EngineError {
    /// Stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Parse(e) => e.code(),
            EngineError::Rewrite(e) => e.code(),
            EngineError::Storage(_) => "QDX_STORAGE_FAILURE",
            EngineError::NoDataSource(_) => "QDX_NO_DATA_SOURCE",
            EngineError::InvalidPredicate(_) => "QDX_INVALID_PREDICATE",
            EngineError::NotMatchable(_) => "QDX_NOT_MATCHABLE",
            EngineError::ProcessorReused => "QDX_PROCESSOR_REUSED",
            EngineError::InvalidOptions(_) => "QDX_INVALID_OPTIONS",
            EngineError::FieldNotStored(_) => "QDX_FIELD_NOT_STORED",
            EngineError::FieldCardinality { .. } => "QDX_FIELD_CARDINALITY",
            EngineError::Cardinality(_) => "QDX_NO_CARDINALITY",
            EngineError::Unsupported(_) => "QDX_UNSUPPORTED",
        }
    }

    /// Whether the caller's query text caused this error
    pub fn is_user_error(&self) -> bool {
        matches!(self, EngineError::Parse(_))
    }

    /// Severity used when the error is logged
    pub fn severity(&self) -> Severity {
        if self.is_user_error() {
            Severity::Warn
        } else {
            Severity::Error
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_is_user_error() {
        let err: EngineError = QueryParseError::UnsupportedQuery("foo".into()).into();
        assert!(err.is_user_error());
        assert_eq!(err.severity(), Severity::Warn);
        assert_eq!(err.code(), "QDX_UNSUPPORTED_QUERY");
    }

    #[test]
    fn test_misuse_errors_are_not_user_errors() {
        assert!(!EngineError::ProcessorReused.is_user_error());
        assert_eq!(EngineError::ProcessorReused.severity(), Severity::Error);
    }

    #[test]
    fn test_field_cardinality_display() {
        let err = EngineError::FieldCardinality {
            field: "status".into(),
            count: 2,
        };
        assert_eq!(
            err.to_string(),
            "Field status holds 2 values, expected exactly one"
        );
    }
}
