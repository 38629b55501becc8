//! Leaf predicates bound to a field of an index schema
//!
//! An `IndexPredicate` is answered by the index backend, but can also
//! evaluate itself against an in-memory entity. How it matches depends on the
//! field type; multi-valued fields match when any value matches.

use std::any::Any;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::node::{NodeKind, PredicateNode};
use super::operator::write_leaf;
use super::range::{tokenize, IntRange, TimestampRange};
use crate::entity::Entity;
use crate::error::EngineResult;
use crate::query::{ParseResult, QueryParseError};
use crate::schema::{FieldDef, FieldType, FieldValue};

#[derive(Debug, Clone, PartialEq)]
enum Matcher {
    Exact(String),
    Prefix(String),
    Number(i64),
    IntRange(IntRange),
    TimeRange(TimestampRange),
    Tokens(BTreeSet<String>),
}

impl Matcher {
    fn matches(&self, value: &FieldValue) -> bool {
        match self {
            Matcher::Exact(s) => value.as_str() == Some(s.as_str()),
            Matcher::Prefix(p) => value.as_str().map_or(false, |v| v.starts_with(p.as_str())),
            Matcher::Number(n) => value.as_i64() == Some(*n),
            Matcher::IntRange(r) => value.as_i64().map_or(false, |v| r.contains(v)),
            Matcher::TimeRange(r) => value.as_timestamp().map_or(false, |t| r.contains(t)),
            Matcher::Tokens(query) => value
                .as_str()
                .map_or(false, |text| query.is_subset(&tokenize(text))),
        }
    }
}

/// Leaf predicate over one schema field
pub struct IndexPredicate<T> {
    field: Arc<FieldDef<T>>,
    operator: String,
    value: String,
    matcher: Matcher,
}

impl<T> IndexPredicate<T> {
    /// Build a predicate over `field`, interpreting `value` by the field type
    ///
    /// The operator name defaults to the field name.
    pub fn new(field: Arc<FieldDef<T>>, value: impl Into<String>) -> ParseResult<Self> {
        let value = value.into();
        let operator = field.name().to_string();
        let invalid = |reason: &str| QueryParseError::invalid_value(&operator, &value, reason);
        let matcher = match field.field_type() {
            FieldType::Exact => Matcher::Exact(value.clone()),
            FieldType::Prefix => Matcher::Prefix(value.clone()),
            FieldType::Integer => Matcher::Number(
                value
                    .trim()
                    .parse::<i32>()
                    .map(i64::from)
                    .map_err(|_| invalid("not an integer"))?,
            ),
            FieldType::Long => Matcher::Number(
                value
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| invalid("not a long integer"))?,
            ),
            FieldType::IntegerRange => Matcher::IntRange(
                IntRange::parse(&value).ok_or_else(|| invalid("not an integer range"))?,
            ),
            FieldType::Timestamp => Matcher::TimeRange(
                TimestampRange::parse(&value).ok_or_else(|| invalid("not a timestamp"))?,
            ),
            FieldType::FullText => {
                let tokens = tokenize(&value);
                if tokens.is_empty() {
                    return Err(invalid("no searchable words"));
                }
                Matcher::Tokens(tokens)
            }
            FieldType::StoredOnly => return Err(invalid("field is not searchable")),
        };
        Ok(Self {
            field,
            operator,
            value,
            matcher,
        })
    }

    /// Timestamp range predicate with an explicit operator name and display value
    pub fn time_range(
        field: Arc<FieldDef<T>>,
        operator: impl Into<String>,
        value: impl Into<String>,
        range: TimestampRange,
    ) -> ParseResult<Self> {
        let operator = operator.into();
        let value = value.into();
        if field.field_type() != FieldType::Timestamp {
            return Err(QueryParseError::invalid_value(
                &operator,
                &value,
                format!("field {} is not a timestamp", field.name()),
            ));
        }
        Ok(Self {
            field,
            operator,
            value,
            matcher: Matcher::TimeRange(range),
        })
    }

    /// Rename the operator shown in display and used for wildcard matching
    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = operator.into();
        self
    }

    pub fn field(&self) -> &Arc<FieldDef<T>> {
        &self.field
    }

    pub fn operator(&self) -> &str {
        &self.operator
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Timestamp bounds, if this is a timestamp predicate
    pub fn time_bounds(&self) -> Option<TimestampRange> {
        match &self.matcher {
            Matcher::TimeRange(r) => Some(*r),
            _ => None,
        }
    }

    /// Earliest instant matched, if bounded below
    pub fn min_timestamp(&self) -> Option<DateTime<Utc>> {
        self.time_bounds().and_then(|r| r.min)
    }

    /// Whether at most one entity can match
    pub fn is_unique_match(&self) -> bool {
        self.field.is_unique() && matches!(self.matcher, Matcher::Exact(_) | Matcher::Number(_))
    }

    /// Evaluate directly against an entity's field values
    pub fn matches_entity(&self, entity: &T) -> bool {
        self.field
            .values(entity)
            .iter()
            .any(|v| self.matcher.matches(v))
    }
}

impl<T: Entity> PredicateNode<T> for IndexPredicate<T> {
    fn kind(&self) -> NodeKind<'_> {
        NodeKind::Operator {
            name: &self.operator,
            value: &self.value,
        }
    }

    fn is_matchable(&self) -> bool {
        true
    }

    fn matches(&self, entity: &T) -> EngineResult<bool> {
        Ok(self.matches_entity(entity))
    }

    fn cardinality(&self) -> Option<u64> {
        self.is_unique_match().then_some(1)
    }

    fn as_index_predicate(&self) -> Option<&IndexPredicate<T>> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T> fmt::Display for IndexPredicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_leaf(f, &self.operator, &self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::Predicate;
    use crate::schema::FieldGetter;
    use chrono::TimeZone;

    #[derive(Clone)]
    struct Doc {
        id: i32,
        title: String,
        tags: Vec<String>,
        size: i32,
        updated: DateTime<Utc>,
    }

    impl Entity for Doc {
        type Id = i32;
        fn id(&self) -> i32 {
            self.id
        }
    }

    fn doc() -> Doc {
        Doc {
            id: 42,
            title: "The Quick Brown".into(),
            tags: vec!["alpha".into(), "beta".into()],
            size: 12,
            updated: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    fn field(name: &str, field_type: FieldType) -> Arc<FieldDef<Doc>> {
        let getter: FieldGetter<Doc> = match name {
            "id" => |d| vec![FieldValue::Int(d.id)],
            "title" => |d| vec![FieldValue::from(d.title.clone())],
            "tag" => |d| d.tags.iter().cloned().map(FieldValue::from).collect(),
            "size" => |d| vec![FieldValue::Int(d.size)],
            _ => |d| vec![FieldValue::Timestamp(d.updated)],
        };
        Arc::new(FieldDef::new(name, field_type, getter))
    }

    fn matches(name: &str, field_type: FieldType, value: &str) -> bool {
        IndexPredicate::new(field(name, field_type), value)
            .unwrap()
            .matches_entity(&doc())
    }

    #[test]
    fn test_full_text_token_subset() {
        assert!(matches("title", FieldType::FullText, "quick brown"));
        assert!(!matches("title", FieldType::FullText, "quick fox"));
    }

    #[test]
    fn test_full_text_requires_words() {
        assert!(IndexPredicate::new(field("title", FieldType::FullText), "  ,").is_err());
    }

    #[test]
    fn test_exact_and_prefix() {
        assert!(matches("title", FieldType::Exact, "The Quick Brown"));
        assert!(!matches("title", FieldType::Exact, "The Quick"));
        assert!(matches("title", FieldType::Prefix, "The Quick"));
    }

    #[test]
    fn test_repeatable_any_value_matches() {
        assert!(matches("tag", FieldType::Exact, "beta"));
        assert!(!matches("tag", FieldType::Exact, "gamma"));
    }

    #[test]
    fn test_integer_and_ranges() {
        assert!(matches("id", FieldType::Integer, "42"));
        assert!(matches("size", FieldType::IntegerRange, ">10"));
        assert!(matches("size", FieldType::IntegerRange, "10..12"));
        assert!(!matches("size", FieldType::IntegerRange, "<12"));
    }

    #[test]
    fn test_integer_rejects_text() {
        let err = IndexPredicate::new(field("id", FieldType::Integer), "abc")
            .err()
            .unwrap();
        assert_eq!(err.code(), "QDX_INVALID_VALUE");
    }

    #[test]
    fn test_timestamp_comparison() {
        assert!(matches("updated", FieldType::Timestamp, ">=2024-05-01"));
        assert!(!matches("updated", FieldType::Timestamp, "<2024-05-01"));
    }

    #[test]
    fn test_stored_only_not_searchable() {
        assert!(IndexPredicate::new(field("title", FieldType::StoredOnly), "x").is_err());
    }

    #[test]
    fn test_display_and_equality_use_operator_and_value() {
        let a = Predicate::new(IndexPredicate::new(field("title", FieldType::Exact), "a b").unwrap());
        let b = Predicate::new(IndexPredicate::new(field("title", FieldType::Exact), "a b").unwrap());
        assert_eq!(a.to_string(), "title:\"a b\"");
        assert_eq!(a, b);
    }

    #[test]
    fn test_unique_match_has_cardinality_one() {
        let unique = Arc::new(
            FieldDef::integer("id", (|d: &Doc| vec![FieldValue::Int(d.id)]) as FieldGetter<Doc>)
                .unique(),
        );
        let p = Predicate::new(IndexPredicate::new(unique, "42").unwrap());
        assert_eq!(p.cardinality(), Some(1));
        let q = Predicate::new(IndexPredicate::new(field("id", FieldType::Integer), "42").unwrap());
        assert_eq!(q.cardinality(), None);
    }
}
