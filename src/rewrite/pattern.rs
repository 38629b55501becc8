//! Pattern nodes and the structural matcher
//!
//! A rule pattern is an ordinary predicate tree that may also contain
//! [`VariablePredicate`] markers and [`WildcardPredicate`] leaves. Matching
//! an AND/OR/NOT pattern node is order independent: every pattern child must
//! match a distinct actual child.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

use super::rule::Bindings;
use crate::entity::Entity;
use crate::error::{EngineError, EngineResult};
use crate::predicate::{NodeKind, Predicate, PredicateNode};

/// Binds whatever it matches to a name, optionally constrained by a
/// sub-pattern
pub struct VariablePredicate<T: Entity> {
    name: String,
    pattern: Vec<Predicate<T>>,
}

impl<T: Entity> VariablePredicate<T> {
    pub fn new(name: impl Into<String>, pattern: Option<Predicate<T>>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into_iter().collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> Option<&Predicate<T>> {
        self.pattern.first()
    }
}

impl<T: Entity> PredicateNode<T> for VariablePredicate<T> {
    fn kind(&self) -> NodeKind<'_> {
        NodeKind::Variable { name: &self.name }
    }

    fn children(&self) -> &[Predicate<T>] {
        &self.pattern
    }

    fn copy(&self, mut children: Vec<Predicate<T>>) -> EngineResult<Predicate<T>> {
        if children.len() > 1 {
            return Err(EngineError::InvalidPredicate(format!(
                "variable {} takes at most one pattern",
                self.name
            )));
        }
        Ok(Predicate::new(VariablePredicate::new(self.name.clone(), children.pop())))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T: Entity> fmt::Display for VariablePredicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pattern() {
            Some(p) => write!(f, "{}=({})", self.name, p),
            None => write!(f, "${}", self.name),
        }
    }
}

/// Matches any operator leaf with this name, whatever its value
pub struct WildcardPredicate<T> {
    name: String,
    _entity: PhantomData<fn() -> T>,
}

impl<T> WildcardPredicate<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> PredicateNode<T> for WildcardPredicate<T> {
    fn kind(&self) -> NodeKind<'_> {
        NodeKind::Wildcard { name: &self.name }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T> fmt::Display for WildcardPredicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:*", self.name)
    }
}

/// Outcome of matching a pattern at the root of a tree
pub struct PatternMatch<T: Entity> {
    pub bindings: Bindings<T>,
    /// Children of a root AND/OR the pattern did not consume
    pub leftover: Vec<Predicate<T>>,
}

/// Match `pattern` against `actual`
///
/// At the root, an AND/OR pattern with fewer children than `actual` may
/// match a subset of its children; the rest are returned as leftovers.
pub fn match_pattern<T: Entity>(pattern: &Predicate<T>, actual: &Predicate<T>) -> Option<PatternMatch<T>> {
    let mut bindings = Bindings::new();
    let partial = matches!(pattern.kind(), NodeKind::And | NodeKind::Or)
        && pattern.kind() == actual.kind()
        && pattern.child_count() < actual.child_count();

    if !partial {
        return match_node(pattern, actual, &mut bindings).then(|| PatternMatch {
            bindings,
            leftover: Vec::new(),
        });
    }

    let mut used = vec![false; actual.child_count()];
    if !match_children(pattern.children(), actual.children(), &mut used, &mut bindings) {
        return None;
    }
    let leftover = actual
        .children()
        .iter()
        .zip(&used)
        .filter(|(_, used)| !**used)
        .map(|(c, _)| c.clone())
        .collect();
    Some(PatternMatch { bindings, leftover })
}

/// Full match of one node; `bindings` is unchanged on failure
fn match_node<T: Entity>(pattern: &Predicate<T>, actual: &Predicate<T>, bindings: &mut Bindings<T>) -> bool {
    let saved = bindings.clone();
    let ok = try_match(pattern, actual, bindings);
    if !ok {
        *bindings = saved;
    }
    ok
}

fn try_match<T: Entity>(pattern: &Predicate<T>, actual: &Predicate<T>, bindings: &mut Bindings<T>) -> bool {
    match pattern.kind() {
        NodeKind::Variable { name } => {
            if let Some(sub) = pattern.child(0) {
                if !try_match(sub, actual, bindings) {
                    return false;
                }
            }
            match bindings.get(name) {
                Some(bound) => bound == actual,
                None => {
                    bindings.insert(name.to_string(), actual.clone());
                    true
                }
            }
        }
        NodeKind::Wildcard { name } => {
            matches!(actual.kind(), NodeKind::Operator { name: op, .. } if op == name)
        }
        _ if pattern.child_count() == 0 => pattern == actual,
        kind => {
            if kind != actual.kind() || pattern.child_count() != actual.child_count() {
                return false;
            }
            let mut used = vec![false; actual.child_count()];
            match_children(pattern.children(), actual.children(), &mut used, bindings)
        }
    }
}

/// Assign every pattern child to a distinct unused actual child, backtracking
fn match_children<T: Entity>(
    patterns: &[Predicate<T>],
    actual: &[Predicate<T>],
    used: &mut [bool],
    bindings: &mut Bindings<T>,
) -> bool {
    let Some((first, rest)) = patterns.split_first() else {
        return true;
    };
    for (i, candidate) in actual.iter().enumerate() {
        if used[i] {
            continue;
        }
        let saved = bindings.clone();
        if try_match(first, candidate, bindings) {
            used[i] = true;
            if match_children(rest, actual, used, bindings) {
                return true;
            }
            used[i] = false;
        }
        *bindings = saved;
    }
    false
}
