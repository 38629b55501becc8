//! Boolean combinators and the always-true predicate

use std::any::Any;
use std::fmt;

use super::node::{NodeKind, Predicate, PredicateNode};
use crate::entity::Entity;
use crate::error::{EngineError, EngineResult};

/// Sum of child costs, saturating
pub(crate) fn sum_cost<T: Entity>(children: &[Predicate<T>]) -> u64 {
    children
        .iter()
        .fold(0u64, |acc, c| acc.saturating_add(c.estimate_cost()))
}

pub(crate) fn write_joined<T: Entity>(
    f: &mut fmt::Formatter<'_>,
    children: &[Predicate<T>],
    separator: &str,
) -> fmt::Result {
    f.write_str("(")?;
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{}", child)?;
    }
    f.write_str(")")
}

/// Conjunction of two or more children
pub struct AndPredicate<T: Entity> {
    children: Vec<Predicate<T>>,
}

impl<T: Entity> AndPredicate<T> {
    /// Build a conjunction, flattening nested conjunctions
    ///
    /// Fails with fewer than two children after flattening.
    pub fn new(children: Vec<Predicate<T>>) -> EngineResult<Self> {
        let mut flat = Vec::with_capacity(children.len());
        for child in children {
            if child.is::<AndPredicate<T>>() {
                flat.extend(child.children().iter().cloned());
            } else {
                flat.push(child);
            }
        }
        if flat.len() < 2 {
            return Err(EngineError::InvalidPredicate(format!(
                "AND requires at least 2 children, got {}",
                flat.len()
            )));
        }
        Ok(Self::from_flat(flat))
    }

    pub(crate) fn from_flat(children: Vec<Predicate<T>>) -> Self {
        Self { children }
    }
}

impl<T: Entity> PredicateNode<T> for AndPredicate<T> {
    fn kind(&self) -> NodeKind<'_> {
        NodeKind::And
    }

    fn children(&self) -> &[Predicate<T>] {
        &self.children
    }

    fn copy(&self, children: Vec<Predicate<T>>) -> EngineResult<Predicate<T>> {
        Ok(Predicate::and(children))
    }

    fn estimate_cost(&self) -> u64 {
        sum_cost(&self.children)
    }

    fn is_matchable(&self) -> bool {
        self.children.iter().all(Predicate::is_matchable)
    }

    fn matches(&self, entity: &T) -> EngineResult<bool> {
        for child in &self.children {
            if !child.matches(entity)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T: Entity> fmt::Display for AndPredicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_joined(f, &self.children, " ")
    }
}

/// Disjunction of two or more children
pub struct OrPredicate<T: Entity> {
    children: Vec<Predicate<T>>,
}

impl<T: Entity> OrPredicate<T> {
    /// Build a disjunction, flattening nested disjunctions
    ///
    /// Fails with fewer than two children after flattening.
    pub fn new(children: Vec<Predicate<T>>) -> EngineResult<Self> {
        let mut flat = Vec::with_capacity(children.len());
        for child in children {
            if child.is::<OrPredicate<T>>() {
                flat.extend(child.children().iter().cloned());
            } else {
                flat.push(child);
            }
        }
        if flat.len() < 2 {
            return Err(EngineError::InvalidPredicate(format!(
                "OR requires at least 2 children, got {}",
                flat.len()
            )));
        }
        Ok(Self::from_flat(flat))
    }

    pub(crate) fn from_flat(children: Vec<Predicate<T>>) -> Self {
        Self { children }
    }
}

impl<T: Entity> PredicateNode<T> for OrPredicate<T> {
    fn kind(&self) -> NodeKind<'_> {
        NodeKind::Or
    }

    fn children(&self) -> &[Predicate<T>] {
        &self.children
    }

    fn copy(&self, children: Vec<Predicate<T>>) -> EngineResult<Predicate<T>> {
        Predicate::or(children)
    }

    fn estimate_cost(&self) -> u64 {
        sum_cost(&self.children)
    }

    fn is_matchable(&self) -> bool {
        self.children.iter().all(Predicate::is_matchable)
    }

    fn matches(&self, entity: &T) -> EngineResult<bool> {
        for child in &self.children {
            if child.matches(entity)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T: Entity> fmt::Display for OrPredicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_joined(f, &self.children, " OR ")
    }
}

/// Negation of exactly one child, never of another negation
pub struct NotPredicate<T: Entity> {
    children: [Predicate<T>; 1],
}

impl<T: Entity> NotPredicate<T> {
    pub(crate) fn wrap(child: Predicate<T>) -> Self {
        Self { children: [child] }
    }
}

impl<T: Entity> PredicateNode<T> for NotPredicate<T> {
    fn kind(&self) -> NodeKind<'_> {
        NodeKind::Not
    }

    fn children(&self) -> &[Predicate<T>] {
        &self.children
    }

    fn copy(&self, mut children: Vec<Predicate<T>>) -> EngineResult<Predicate<T>> {
        if children.len() != 1 {
            return Err(EngineError::InvalidPredicate(format!(
                "NOT requires exactly 1 child, got {}",
                children.len()
            )));
        }
        Ok(Predicate::not(children.remove(0)))
    }

    fn estimate_cost(&self) -> u64 {
        self.children[0].estimate_cost()
    }

    fn is_matchable(&self) -> bool {
        self.children[0].is_matchable()
    }

    fn matches(&self, entity: &T) -> EngineResult<bool> {
        Ok(!self.children[0].matches(entity)?)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T: Entity> fmt::Display for NotPredicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-{}", self.children[0])
    }
}

/// Always true, zero cost
///
/// Stateless, so every instance is equal to every other.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyPredicate;

impl<T: Entity> PredicateNode<T> for AnyPredicate {
    fn kind(&self) -> NodeKind<'_> {
        NodeKind::Any
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

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Display for AnyPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ANY")
    }
}
