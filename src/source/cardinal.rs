//! AND/OR combinators that carry a cardinality estimate

use std::any::Any;
use std::fmt;

use crate::entity::Entity;
use crate::error::{EngineError, EngineResult};
use crate::predicate::{sum_cost, write_joined, NodeKind, Predicate, PredicateNode};

fn require_children<T: Entity>(children: &[Predicate<T>], what: &str) -> EngineResult<()> {
    if children.len() < 2 {
        return Err(EngineError::InvalidPredicate(format!(
            "{} requires at least 2 children, got {}",
            what,
            children.len()
        )));
    }
    Ok(())
}

/// Conjunction whose cardinality is the smallest known child cardinality
///
/// Every other child can only shrink the result, so the minimum is an upper
/// bound. At least one child must expose a cardinality.
pub struct AndCardinalPredicate<T: Entity> {
    children: Vec<Predicate<T>>,
    cardinality: u64,
}

impl<T: Entity> AndCardinalPredicate<T> {
    pub fn new(children: Vec<Predicate<T>>) -> EngineResult<Self> {
        require_children(&children, "AND")?;
        let cardinality = children
            .iter()
            .filter_map(Predicate::cardinality)
            .min()
            .ok_or_else(|| {
                EngineError::Cardinality(format!("no child of {} has a cardinality", Joined(&children, " ")))
            })?;
        Ok(Self {
            children,
            cardinality,
        })
    }
}

impl<T: Entity> PredicateNode<T> for AndCardinalPredicate<T> {
    fn kind(&self) -> NodeKind<'_> {
        NodeKind::And
    }

    fn children(&self) -> &[Predicate<T>] {
        &self.children
    }

    fn copy(&self, children: Vec<Predicate<T>>) -> EngineResult<Predicate<T>> {
        Ok(Predicate::new(AndCardinalPredicate::new(children)?))
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

    fn cardinality(&self) -> Option<u64> {
        Some(self.cardinality)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T: Entity> fmt::Display for AndCardinalPredicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_joined(f, &self.children, " ")
    }
}

/// Disjunction whose cardinality is the sum of its children's
///
/// Every child must expose a cardinality.
pub struct OrCardinalPredicate<T: Entity> {
    children: Vec<Predicate<T>>,
    cardinality: u64,
}

impl<T: Entity> OrCardinalPredicate<T> {
    pub fn new(children: Vec<Predicate<T>>) -> EngineResult<Self> {
        require_children(&children, "OR")?;
        let mut cardinality = 0u64;
        for child in &children {
            let c = child
                .cardinality()
                .ok_or_else(|| EngineError::Cardinality(child.to_string()))?;
            cardinality = cardinality.saturating_add(c);
        }
        Ok(Self {
            children,
            cardinality,
        })
    }
}

impl<T: Entity> PredicateNode<T> for OrCardinalPredicate<T> {
    fn kind(&self) -> NodeKind<'_> {
        NodeKind::Or
    }

    fn children(&self) -> &[Predicate<T>] {
        &self.children
    }

    fn copy(&self, children: Vec<Predicate<T>>) -> EngineResult<Predicate<T>> {
        Ok(Predicate::new(OrCardinalPredicate::new(children)?))
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

    fn cardinality(&self) -> Option<u64> {
        Some(self.cardinality)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T: Entity> fmt::Display for OrCardinalPredicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_joined(f, &self.children, " OR ")
    }
}

struct Joined<'a, T: Entity>(&'a [Predicate<T>], &'static str);

impl<T: Entity> fmt::Display for Joined<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_joined(f, self.0, self.1)
    }
}
