//! Field type and value definitions
//!
//! Field types describe how an index stores a field and therefore how an
//! `IndexPredicate` over that field evaluates against an in-memory entity:
//! - exact: whole-value string equality
//! - prefix: string prefix
//! - integer / long: numeric equality
//! - integer_range: numeric comparisons (`>=5`, `<3`, `1..10`)
//! - timestamp: instant ranges
//! - full_text: case-folded token subset
//! - stored_only: retrievable, never searchable

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Supported index field types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Whole-value string equality
    Exact,
    /// String prefix match
    Prefix,
    /// 32-bit integer equality
    Integer,
    /// 32-bit integer with comparison and range queries
    IntegerRange,
    /// 64-bit integer equality
    Long,
    /// Instant range queries
    Timestamp,
    /// Tokenized, case-folded text
    FullText,
    /// Stored for retrieval, not searchable
    StoredOnly,
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::Exact => "exact",
            FieldType::Prefix => "prefix",
            FieldType::Integer => "integer",
            FieldType::IntegerRange => "integer_range",
            FieldType::Long => "long",
            FieldType::Timestamp => "timestamp",
            FieldType::FullText => "full_text",
            FieldType::StoredOnly => "stored_only",
        }
    }

    /// Whether predicates may be built over fields of this type
    pub fn is_searchable(&self) -> bool {
        !matches!(self, FieldType::StoredOnly)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// A primitive value extracted from an entity for one field
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Str(String),
    Int(i32),
    Long(i64),
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view of integer and long values
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(i64::from(*i)),
            FieldValue::Long(l) => Some(*l),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::Timestamp(t) => Some(*t),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Str(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Str(s)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        FieldValue::Int(i)
    }
}

impl From<i64> for FieldValue {
    fn from(l: i64) -> Self {
        FieldValue::Long(l)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(t: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(t)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Str(s) => f.write_str(s),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Long(l) => write!(f, "{}", l),
            FieldValue::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_stored_only_is_not_searchable() {
        assert!(!FieldType::StoredOnly.is_searchable());
        assert!(FieldType::FullText.is_searchable());
    }

    #[test]
    fn test_numeric_view() {
        assert_eq!(FieldValue::Int(7).as_i64(), Some(7));
        assert_eq!(FieldValue::Long(-3).as_i64(), Some(-3));
        assert_eq!(FieldValue::from("x").as_i64(), None);
    }

    #[test]
    fn test_value_serializes_untagged() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let json = serde_json::to_string(&vec![
            FieldValue::from("a"),
            FieldValue::Int(1),
            FieldValue::Timestamp(ts),
        ])
        .unwrap();
        assert_eq!(json, r#"["a",1,"2024-01-02T03:04:05Z"]"#);
    }
}
