//! Predicate node contract and the shared `Predicate` handle
//!
//! A predicate tree is built from reference-counted, immutable nodes. Every
//! transformation builds a new tree through `copy(children)`; subtrees that
//! do not change are shared between the old and new tree.
//!
//! Capabilities are optional and queried through methods that return `None`
//! or `false` when a node does not offer them:
//! - matchable: `is_matchable` / `matches`
//! - data source: `as_data_source`
//! - cardinality: `cardinality`

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::combinators::{AndPredicate, AnyPredicate, NotPredicate, OrPredicate};
use super::index::IndexPredicate;
use crate::entity::Entity;
use crate::error::{EngineError, EngineResult};
use crate::source::DataSource;

/// Structural identity of a node, excluding its children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind<'a> {
    /// Always true
    Any,
    And,
    Or,
    Not,
    /// A leaf binding an operator name to a literal value
    Operator { name: &'a str, value: &'a str },
    /// Rewrite pattern marker binding whatever it matches to a name
    Variable { name: &'a str },
    /// Rewrite pattern leaf matching any operator with this name
    Wildcard { name: &'a str },
    /// Any other combinator, identified by a tag
    Composite(&'a str),
}

/// A node of a predicate tree over entities of type `T`
pub trait PredicateNode<T: Entity>: fmt::Display + Send + Sync + 'static {
    fn kind(&self) -> NodeKind<'_>;

    fn children(&self) -> &[Predicate<T>] {
        &[]
    }

    /// Build a node of the same type over new children
    fn copy(&self, children: Vec<Predicate<T>>) -> EngineResult<Predicate<T>> {
        Err(EngineError::InvalidPredicate(format!(
            "{} cannot take {} children",
            self,
            children.len()
        )))
    }

    /// Relative evaluation cost; higher is more expensive
    fn estimate_cost(&self) -> u64 {
        1
    }

    fn is_matchable(&self) -> bool {
        false
    }

    /// Evaluate against an in-memory entity
    fn matches(&self, _entity: &T) -> EngineResult<bool> {
        Err(EngineError::NotMatchable(self.to_string()))
    }

    fn as_data_source(&self) -> Option<&dyn DataSource<T>> {
        None
    }

    /// Estimated upper bound on the number of matching entities
    fn cardinality(&self) -> Option<u64> {
        None
    }

    fn as_index_predicate(&self) -> Option<&IndexPredicate<T>> {
        None
    }

    /// Result limit embedded in the query, if this node carries one
    fn limit(&self) -> Option<usize> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to an immutable predicate node
pub struct Predicate<T: Entity> {
    node: Arc<dyn PredicateNode<T>>,
}

impl<T: Entity> Predicate<T> {
    pub fn new<N: PredicateNode<T>>(node: N) -> Self {
        Self {
            node: Arc::new(node),
        }
    }

    /// The always-true, zero-cost predicate
    pub fn any() -> Self {
        Self::new(AnyPredicate)
    }

    /// Conjunction of `children`
    ///
    /// Nested conjunctions are flattened and always-true children dropped.
    /// No children yields [`Predicate::any`]; one child is returned as is.
    pub fn and(children: Vec<Predicate<T>>) -> Self {
        let mut flat = Vec::with_capacity(children.len());
        for child in children {
            if child.is::<AnyPredicate>() {
                continue;
            }
            if child.is::<AndPredicate<T>>() {
                flat.extend(child.children().iter().cloned());
            } else {
                flat.push(child);
            }
        }
        match flat.len() {
            0 => Self::any(),
            1 => flat.remove(0),
            _ => Self::new(AndPredicate::from_flat(flat)),
        }
    }

    /// Disjunction of `children`
    ///
    /// Nested disjunctions are flattened; one child is returned as is and an
    /// always-true child makes the whole disjunction always true.
    pub fn or(children: Vec<Predicate<T>>) -> EngineResult<Self> {
        let mut flat = Vec::with_capacity(children.len());
        for child in children {
            if child.is::<AnyPredicate>() {
                return Ok(Self::any());
            }
            if child.is::<OrPredicate<T>>() {
                flat.extend(child.children().iter().cloned());
            } else {
                flat.push(child);
            }
        }
        match flat.len() {
            0 => Err(EngineError::InvalidPredicate(
                "OR requires at least one child".to_string(),
            )),
            1 => Ok(flat.remove(0)),
            _ => Ok(Self::new(OrPredicate::from_flat(flat))),
        }
    }

    /// Negation of `p`; negating a negation returns the original predicate
    pub fn not(p: Predicate<T>) -> Self {
        if p.is::<NotPredicate<T>>() {
            if let Some(inner) = p.children().first() {
                return inner.clone();
            }
        }
        Self::new(NotPredicate::wrap(p))
    }

    pub fn kind(&self) -> NodeKind<'_> {
        self.node.kind()
    }

    pub fn children(&self) -> &[Predicate<T>] {
        self.node.children()
    }

    pub fn child(&self, i: usize) -> Option<&Predicate<T>> {
        self.children().get(i)
    }

    pub fn child_count(&self) -> usize {
        self.children().len()
    }

    /// Rebuild this node over new children
    ///
    /// A leaf copied with no children is returned unchanged.
    pub fn copy(&self, children: Vec<Predicate<T>>) -> EngineResult<Predicate<T>> {
        if children.is_empty() && self.children().is_empty() {
            return Ok(self.clone());
        }
        self.node.copy(children)
    }

    pub fn estimate_cost(&self) -> u64 {
        self.node.estimate_cost()
    }

    pub fn is_matchable(&self) -> bool {
        self.node.is_matchable()
    }

    pub fn matches(&self, entity: &T) -> EngineResult<bool> {
        self.node.matches(entity)
    }

    pub fn as_data_source(&self) -> Option<&dyn DataSource<T>> {
        self.node.as_data_source()
    }

    pub fn is_data_source(&self) -> bool {
        self.as_data_source().is_some()
    }

    pub fn cardinality(&self) -> Option<u64> {
        self.node.cardinality()
    }

    pub fn as_index_predicate(&self) -> Option<&IndexPredicate<T>> {
        self.node.as_index_predicate()
    }

    /// First embedded limit found in a depth-first walk
    pub fn find_limit(&self) -> Option<usize> {
        self.node
            .limit()
            .or_else(|| self.children().iter().find_map(Predicate::find_limit))
    }

    /// Whether the node is of concrete type `N`
    pub fn is<N: 'static>(&self) -> bool {
        self.node.as_any().is::<N>()
    }

    pub fn downcast_ref<N: 'static>(&self) -> Option<&N> {
        self.node.as_any().downcast_ref::<N>()
    }

    /// Number of leaves in the tree
    pub fn leaf_count(&self) -> usize {
        if self.children().is_empty() {
            1
        } else {
            self.children().iter().map(Predicate::leaf_count).sum()
        }
    }
}

impl<T: Entity> Clone for Predicate<T> {
    fn clone(&self) -> Self {
        Self {
            node: Arc::clone(&self.node),
        }
    }
}

impl<T: Entity> PartialEq for Predicate<T> {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.node, &other.node) {
            return true;
        }
        self.kind() == other.kind() && self.children() == other.children()
    }
}

impl<T: Entity> Eq for Predicate<T> {}

impl<T: Entity> Hash for Predicate<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        self.children().hash(state);
    }
}

impl<T: Entity> fmt::Display for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.node, f)
    }
}

impl<T: Entity> fmt::Debug for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Predicate({})", self)
    }
}
