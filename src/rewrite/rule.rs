//! Rewrite rules

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::errors::RewriteError;
use super::pattern::match_pattern;
use crate::entity::Entity;
use crate::error::{EngineError, EngineResult};
use crate::predicate::{NodeKind, Predicate};

/// Variable name to the subtree it matched
pub type Bindings<T> = HashMap<String, Predicate<T>>;

/// Builds the replacement for one match
pub type Replacement<T> = Arc<dyn Fn(&Captures<'_, T>) -> EngineResult<Predicate<T>> + Send + Sync>;

/// Which result wins when several rules match the same node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CostPolicy {
    /// Keep the cheapest replacement among all matching rules
    #[default]
    BestCost,
    /// Apply this rule as soon as it matches
    FirstMatch,
}

/// Bindings of one match, as seen by a replacement function
pub struct Captures<'a, T: Entity> {
    rule: &'a str,
    bindings: &'a Bindings<T>,
}

impl<'a, T: Entity> Captures<'a, T> {
    /// The subtree bound to `variable`
    pub fn get(&self, variable: &str) -> EngineResult<&'a Predicate<T>> {
        self.bindings.get(variable).ok_or_else(|| {
            RewriteError::UnboundVariable {
                rule: self.rule.to_string(),
                variable: variable.to_string(),
            }
            .into()
        })
    }

    /// Value of the operator leaf bound to `variable`
    pub fn value(&self, variable: &str) -> EngineResult<&'a str> {
        match self.get(variable)?.kind() {
            NodeKind::Operator { value, .. } => Ok(value),
            _ => Err(RewriteError::Replacement {
                rule: self.rule.to_string(),
                reason: format!("{} is not bound to an operator", variable),
            }
            .into()),
        }
    }

    pub fn rule(&self) -> &str {
        self.rule
    }
}

/// A named pattern and the function that replaces what it matches
pub struct Rule<T: Entity> {
    name: String,
    pattern: Predicate<T>,
    replace: Replacement<T>,
    policy: CostPolicy,
}

impl<T: Entity> Rule<T> {
    pub fn new<F>(name: impl Into<String>, pattern: Predicate<T>, replace: F) -> Self
    where
        F: Fn(&Captures<'_, T>) -> EngineResult<Predicate<T>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            pattern,
            replace: Arc::new(replace),
            policy: CostPolicy::BestCost,
        }
    }

    /// Apply without comparing costs against other matching rules
    pub fn first_match(mut self) -> Self {
        self.policy = CostPolicy::FirstMatch;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &Predicate<T> {
        &self.pattern
    }

    pub fn policy(&self) -> CostPolicy {
        self.policy
    }

    /// Rewrite `pred` if the pattern matches it
    ///
    /// Children of a root AND/OR the pattern did not consume are combined
    /// with the replacement under a copy of the root.
    pub fn apply(&self, pred: &Predicate<T>) -> EngineResult<Option<Predicate<T>>> {
        let Some(m) = match_pattern(&self.pattern, pred) else {
            return Ok(None);
        };
        let captures = Captures {
            rule: &self.name,
            bindings: &m.bindings,
        };
        let replacement = (self.replace)(&captures).map_err(|e| match e {
            EngineError::Rewrite(e) => EngineError::Rewrite(e),
            other => RewriteError::Replacement {
                rule: self.name.clone(),
                reason: other.to_string(),
            }
            .into(),
        })?;

        if m.leftover.is_empty() {
            return Ok(Some(replacement));
        }
        let mut children = Vec::with_capacity(m.leftover.len() + 1);
        children.push(replacement);
        children.extend(m.leftover);
        pred.copy(children).map(Some)
    }
}

impl<T: Entity> fmt::Debug for Rule<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("pattern", &self.pattern)
            .field("policy", &self.policy)
            .finish()
    }
}
