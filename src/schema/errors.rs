//! Schema definition errors
//!
//! Raised while assembling an index schema. These are programming errors in
//! the schema declaration and never caused by query text.

use thiserror::Error;

/// Schema construction errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Field name is empty
    #[error("Schema {schema} declares a field with an empty name")]
    EmptyFieldName { schema: String },

    /// Two fields share a name
    #[error("Schema {schema} declares field {field} twice")]
    DuplicateField { schema: String, field: String },

    /// Unique fields identify one entity per value and cannot be multi-valued
    #[error("Schema {schema} declares field {field} both unique and repeatable")]
    UniqueRepeatable { schema: String, field: String },
}

impl SchemaError {
    /// Stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            SchemaError::EmptyFieldName { .. } => "QDX_SCHEMA_EMPTY_FIELD",
            SchemaError::DuplicateField { .. } => "QDX_SCHEMA_DUPLICATE_FIELD",
            SchemaError::UniqueRepeatable { .. } => "QDX_SCHEMA_UNIQUE_REPEATABLE",
        }
    }
}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;
