//! Index rewriter: turns a compiled predicate into data sources
//!
//! Subtrees built only from index leaves are handed to the index in one
//! request. Mixed conjunctions become an [`AndSource`] that reads the
//! indexed part and filters by the rest; disjunctions of sources become an
//! [`OrSource`].

use std::sync::Arc;

use super::rewriter::{Rewriter, RuleRewriter};
use crate::entity::Entity;
use crate::error::EngineResult;
use crate::index::Index;
use crate::observability::{log_event, Event};
use crate::predicate::{AnyPredicate, LimitPredicate, NodeKind, Predicate};
use crate::processor::QueryOptions;
use crate::query::QueryParseError;
use crate::source::{AndCardinalPredicate, AndSource, IndexedQuery, OrCardinalPredicate, OrSource};

/// How a subtree relates to the index
enum Outcome<T: Entity> {
    /// The index answers it as is
    Indexed,
    /// Nothing in it is index-backed
    Unindexed,
    Rewritten(Predicate<T>),
}

/// Rewriter that applies domain rules, then composes data sources
pub struct IndexRewriter<T: Entity> {
    index: Arc<dyn Index<T>>,
    rules: Option<RuleRewriter<T>>,
}

impl<T: Entity> IndexRewriter<T> {
    pub fn new(index: Arc<dyn Index<T>>) -> Self {
        Self { index, rules: None }
    }

    /// Apply `rules` before composing sources
    pub fn with_rules(mut self, rules: RuleRewriter<T>) -> Self {
        self.rules = Some(rules);
        self
    }

    fn is_index_leaf(&self, pred: &Predicate<T>) -> bool {
        pred.as_index_predicate()
            .is_some_and(|ip| self.index.schema().field(ip.field().name()).is_some())
    }

    fn indexed(&self, pred: Predicate<T>, opts: &QueryOptions) -> Predicate<T> {
        Predicate::new(IndexedQuery::new(Arc::clone(&self.index), pred, opts.clone()))
    }

    fn rewrite_impl(
        &self,
        pred: &Predicate<T>,
        opts: &QueryOptions,
        terms: &mut usize,
    ) -> EngineResult<Outcome<T>> {
        if self.is_index_leaf(pred) {
            *terms += 1;
            return Ok(Outcome::Indexed);
        }
        if pred.is::<LimitPredicate>() || pred.is::<AnyPredicate>() {
            return Ok(Outcome::Indexed);
        }
        if !matches!(pred.kind(), NodeKind::And | NodeKind::Or | NodeKind::Not) {
            return Ok(Outcome::Unindexed);
        }

        let n = pred.child_count();
        let mut children = Vec::with_capacity(n);
        let mut indexed = vec![false; n];
        let (mut n_indexed, mut n_unindexed, mut n_sources) = (0, 0, 0);
        for (i, child) in pred.children().iter().enumerate() {
            match self.rewrite_impl(child, opts, terms)? {
                Outcome::Indexed => {
                    indexed[i] = true;
                    n_indexed += 1;
                    children.push(child.clone());
                }
                Outcome::Unindexed => {
                    n_unindexed += 1;
                    children.push(child.clone());
                }
                Outcome::Rewritten(c) => {
                    if c.is_data_source() {
                        n_sources += 1;
                    }
                    children.push(c);
                }
            }
        }

        if n_indexed == n {
            return Ok(Outcome::Indexed);
        }
        if n_unindexed == n {
            return Ok(Outcome::Unindexed);
        }
        if n_indexed == 0 && n_unindexed == 0 {
            let out = if n_sources == n {
                self.copy(pred, children, opts)?
            } else {
                self.copy_cardinal(pred, children)?
            };
            return Ok(Outcome::Rewritten(out));
        }
        self.partition(pred, children, &indexed, opts)
            .map(Outcome::Rewritten)
    }

    /// Group the indexed children into one index query next to the rest
    fn partition(
        &self,
        pred: &Predicate<T>,
        children: Vec<Predicate<T>>,
        indexed: &[bool],
        opts: &QueryOptions,
    ) -> EngineResult<Predicate<T>> {
        let mut grouped = Vec::new();
        let mut rest = Vec::new();
        for (child, is_indexed) in children.into_iter().zip(indexed) {
            if *is_indexed {
                grouped.push(child);
            } else {
                rest.push(child);
            }
        }
        let query = if grouped.len() == 1 {
            grouped.remove(0)
        } else {
            pred.copy(grouped)?
        };
        let mut all = Vec::with_capacity(rest.len() + 1);
        all.push(self.indexed(query, opts));
        all.extend(rest);
        self.copy(pred, all, opts)
    }

    fn copy(&self, pred: &Predicate<T>, children: Vec<Predicate<T>>, opts: &QueryOptions) -> EngineResult<Predicate<T>> {
        match pred.kind() {
            NodeKind::And => Ok(Predicate::new(AndSource::new(children, opts.clone())?)),
            NodeKind::Or => Ok(Predicate::new(OrSource::new(children)?)),
            _ => pred.copy(children),
        }
    }

    /// Rebuild keeping cardinality estimates when the children allow it
    fn copy_cardinal(&self, pred: &Predicate<T>, children: Vec<Predicate<T>>) -> EngineResult<Predicate<T>> {
        let cardinal = match pred.kind() {
            NodeKind::And => AndCardinalPredicate::new(children.clone()).ok().map(Predicate::new),
            NodeKind::Or => OrCardinalPredicate::new(children.clone()).ok().map(Predicate::new),
            _ => None,
        };
        match cardinal {
            Some(p) => Ok(p),
            None => pred.copy(children),
        }
    }
}

impl<T: Entity> Rewriter<T> for IndexRewriter<T> {
    fn rewrite(&self, pred: &Predicate<T>, opts: &QueryOptions) -> EngineResult<Predicate<T>> {
        let pred = match &self.rules {
            Some(rules) => rules.rewrite_tree(pred)?,
            None => pred.clone(),
        };

        let backend = opts.convert_for_backend();
        let mut terms = 0;
        let outcome = self.rewrite_impl(&pred, &backend, &mut terms)?;
        let max = opts.config().max_terms;
        if terms > max {
            return Err(QueryParseError::TooManyTerms { count: terms, max }.into());
        }

        let out = match outcome {
            Outcome::Indexed => self.indexed(pred, &backend),
            Outcome::Unindexed => pred,
            // The outermost AND applies the caller's start itself
            Outcome::Rewritten(out) if out.is::<AndSource<T>>() => {
                Predicate::new(AndSource::new(out.children().to_vec(), opts.clone())?)
            }
            Outcome::Rewritten(out) => out,
        };
        let rewritten = out.to_string();
        let count = terms.to_string();
        log_event(
            Event::QueryRewritten,
            &[("predicate", rewritten.as_str()), ("terms", count.as_str())],
        );
        Ok(out)
    }
}
