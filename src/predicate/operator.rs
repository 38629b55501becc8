//! Leaf predicates binding an operator name to a literal value

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

use super::node::{NodeKind, PredicateNode};
use crate::entity::Entity;
use crate::error::EngineResult;

/// Whether a value can be written after `name:` without quotes
pub fn is_single_word(value: &str) -> bool {
    !value.is_empty()
        && !value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '(' | ')'))
}

/// Write `name:value`, quoting the value when it is not a single word
pub fn write_leaf(f: &mut fmt::Formatter<'_>, name: &str, value: &str) -> fmt::Result {
    if is_single_word(value) {
        write!(f, "{}:{}", name, value)
    } else {
        write!(f, "{}:\"{}\"", name, value.replace('"', "\\\""))
    }
}

/// A non-matchable leaf; equality and display derive from `(name, value)`
pub struct OperatorPredicate<T> {
    name: String,
    value: String,
    _entity: PhantomData<fn() -> T>,
}

impl<T> OperatorPredicate<T> {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            _entity: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl<T: Entity> PredicateNode<T> for OperatorPredicate<T> {
    fn kind(&self) -> NodeKind<'_> {
        NodeKind::Operator {
            name: &self.name,
            value: &self.value,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T> fmt::Display for OperatorPredicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_leaf(f, &self.name, &self.value)
    }
}

/// In-memory test of an entity against an operator value
pub type MatchFn<T> = fn(&T, &str) -> bool;

/// An operator leaf evaluated in memory rather than by an index
///
/// Used for operators whose condition the index cannot answer; such leaves
/// end up as post-filters of an `AndSource`.
pub struct MatchablePredicate<T> {
    name: String,
    value: String,
    cost: u64,
    matcher: MatchFn<T>,
}

impl<T> MatchablePredicate<T> {
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        cost: u64,
        matcher: MatchFn<T>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            cost,
            matcher,
        }
    }
}

impl<T: Entity> PredicateNode<T> for MatchablePredicate<T> {
    fn kind(&self) -> NodeKind<'_> {
        NodeKind::Operator {
            name: &self.name,
            value: &self.value,
        }
    }

    fn estimate_cost(&self) -> u64 {
        self.cost
    }

    fn is_matchable(&self) -> bool {
        true
    }

    fn matches(&self, entity: &T) -> EngineResult<bool> {
        Ok((self.matcher)(entity, &self.value))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T> fmt::Display for MatchablePredicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_leaf(f, &self.name, &self.value)
    }
}
