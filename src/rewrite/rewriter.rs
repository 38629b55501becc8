//! Fixed-point rule rewriter

use super::errors::RewriteError;
use super::rule::{CostPolicy, Rule};
use crate::entity::Entity;
use crate::error::EngineResult;
use crate::predicate::{NodeKind, Predicate};
use crate::processor::QueryOptions;

/// Passes over one node before the rewrite is abandoned
const MAX_PASSES: usize = 10_000;

/// Transforms a compiled predicate before it is executed
pub trait Rewriter<T: Entity>: Send + Sync {
    fn rewrite(&self, pred: &Predicate<T>, opts: &QueryOptions) -> EngineResult<Predicate<T>>;
}

/// Applies a set of rules until the tree stops changing
#[derive(Debug)]
pub struct RuleRewriter<T: Entity> {
    rules: Vec<Rule<T>>,
}

impl<T: Entity> Default for RuleRewriter<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T: Entity> RuleRewriter<T> {
    pub fn new(rules: Vec<Rule<T>>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule<T>] {
        &self.rules
    }

    /// Rewrite to a fixed point
    ///
    /// Rules are tried against the node itself first; only when none applies
    /// are the children rewritten, de-duplicated and the node rebuilt.
    pub fn rewrite_tree(&self, pred: &Predicate<T>) -> EngineResult<Predicate<T>> {
        let mut current = pred.clone();
        let mut last_rule = String::new();
        for _ in 0..MAX_PASSES {
            let old = current.clone();
            if let Some((rule, out)) = self.rewrite_one(&current)? {
                last_rule = rule.to_string();
                current = out;
            }
            if current == old && current.child_count() > 0 {
                current = self.rewrite_children(&current)?;
            }
            if current == old {
                return Ok(current);
            }
        }
        Err(RewriteError::NoFixedPoint { rule: last_rule }.into())
    }

    /// Best rewrite of `pred` by a single rule application
    fn rewrite_one(&self, pred: &Predicate<T>) -> EngineResult<Option<(&str, Predicate<T>)>> {
        let mut best: Option<(&str, Predicate<T>)> = None;
        for rule in &self.rules {
            let Some(out) = rule.apply(pred)? else {
                continue;
            };
            if rule.policy() == CostPolicy::FirstMatch {
                return Ok(Some((rule.name(), out)));
            }
            let cheaper = best
                .as_ref()
                .map_or(true, |(_, b)| out.estimate_cost() < b.estimate_cost());
            if cheaper {
                best = Some((rule.name(), out));
            }
        }
        Ok(best)
    }

    fn rewrite_children(&self, pred: &Predicate<T>) -> EngineResult<Predicate<T>> {
        let mut children: Vec<Predicate<T>> = Vec::with_capacity(pred.child_count());
        for child in pred.children() {
            let rewritten = self.rewrite_tree(child)?;
            if !children.contains(&rewritten) {
                children.push(rewritten);
            }
        }
        if children.len() == 1 && matches!(pred.kind(), NodeKind::And | NodeKind::Or) {
            return Ok(children.remove(0));
        }
        pred.copy(children)
    }
}

impl<T: Entity> Rewriter<T> for RuleRewriter<T> {
    fn rewrite(&self, pred: &Predicate<T>, _opts: &QueryOptions) -> EngineResult<Predicate<T>> {
        self.rewrite_tree(pred)
    }
}
