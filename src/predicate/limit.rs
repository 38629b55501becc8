//! Result limit embedded in a query

use std::any::Any;
use std::fmt;

use super::node::{NodeKind, PredicateNode};
use super::operator::write_leaf;
use crate::entity::Entity;
use crate::error::EngineResult;
use crate::query::{ParseResult, QueryParseError};

/// Always-true leaf carrying a result limit (`limit:25`)
#[derive(Debug, Clone)]
pub struct LimitPredicate {
    operator: String,
    value: String,
    limit: usize,
}

impl LimitPredicate {
    /// Parse a positive limit
    pub fn new(operator: impl Into<String>, value: &str) -> ParseResult<Self> {
        let operator = operator.into();
        let limit = value
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|l| *l > 0)
            .ok_or_else(|| QueryParseError::invalid_value(&operator, value, "Invalid limit"))?;
        Ok(Self {
            operator,
            value: value.trim().to_string(),
            limit,
        })
    }

    pub fn limit_value(&self) -> usize {
        self.limit
    }
}

impl<T: Entity> PredicateNode<T> for LimitPredicate {
    fn kind(&self) -> NodeKind<'_> {
        NodeKind::Operator {
            name: &self.operator,
            value: &self.value,
        }
    }

    fn estimate_cost(&self) -> u64 {
        0
    }

    fn is_matchable(&self) -> bool {
        true
    }

    fn matches(&self, _entity: &T) -> EngineResult<bool> {
        Ok(true)
    }

    fn limit(&self) -> Option<usize> {
        Some(self.limit)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Display for LimitPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_leaf(f, &self.operator, &self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_positive_limit() {
        assert_eq!(LimitPredicate::new("limit", "25").unwrap().limit_value(), 25);
    }

    #[test]
    fn test_rejects_zero_and_text() {
        assert!(LimitPredicate::new("limit", "0").is_err());
        let err = LimitPredicate::new("limit", "ten").unwrap_err();
        assert_eq!(
            err,
            QueryParseError::invalid_value("limit", "ten", "Invalid limit")
        );
    }
}
