//! A predicate tree answered by the index in one request

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::result_set::{ResultSet, SearchAfter};
use super::{DataSource, Paginated};
use crate::entity::Entity;
use crate::error::{EngineError, EngineResult};
use crate::index::Index;
use crate::predicate::{NodeKind, Predicate, PredicateNode};
use crate::processor::QueryOptions;
use crate::schema::FieldBundle;

/// Wraps an index-answerable predicate as a paginated data source
pub struct IndexedQuery<T: Entity> {
    index: Arc<dyn Index<T>>,
    pred: [Predicate<T>; 1],
    opts: QueryOptions,
}

impl<T: Entity> IndexedQuery<T> {
    pub fn new(index: Arc<dyn Index<T>>, pred: Predicate<T>, opts: QueryOptions) -> Self {
        Self {
            index,
            pred: [pred],
            opts,
        }
    }

    /// The predicate sent to the index
    pub fn query(&self) -> &Predicate<T> {
        &self.pred[0]
    }

    fn search(&self, opts: &QueryOptions) -> EngineResult<ResultSet<T>> {
        self.index.search(self.query(), opts)
    }
}

impl<T: Entity> PredicateNode<T> for IndexedQuery<T> {
    fn kind(&self) -> NodeKind<'_> {
        NodeKind::Composite("index")
    }

    fn children(&self) -> &[Predicate<T>] {
        &self.pred
    }

    fn copy(&self, mut children: Vec<Predicate<T>>) -> EngineResult<Predicate<T>> {
        if children.len() != 1 {
            return Err(EngineError::InvalidPredicate(format!(
                "index query requires exactly 1 child, got {}",
                children.len()
            )));
        }
        Ok(Predicate::new(IndexedQuery::new(
            Arc::clone(&self.index),
            children.remove(0),
            self.opts.clone(),
        )))
    }

    fn estimate_cost(&self) -> u64 {
        self.query().estimate_cost()
    }

    fn is_matchable(&self) -> bool {
        self.query().is_matchable()
    }

    fn matches(&self, entity: &T) -> EngineResult<bool> {
        self.query().matches(entity)
    }

    fn as_data_source(&self) -> Option<&dyn DataSource<T>> {
        Some(self)
    }

    fn cardinality(&self) -> Option<u64> {
        Some(DataSource::cardinality(self))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T: Entity> DataSource<T> for IndexedQuery<T> {
    fn cardinality(&self) -> u64 {
        self.query()
            .cardinality()
            .unwrap_or_else(|| self.index.cardinality(self.query()))
    }

    fn read(&self) -> EngineResult<ResultSet<T>> {
        self.search(&self.opts)
    }

    fn read_raw(&self) -> EngineResult<ResultSet<FieldBundle>> {
        self.index.search_raw(self.query(), &self.opts)
    }

    fn as_paginated(&self) -> Option<&dyn Paginated<T>> {
        Some(self)
    }
}

impl<T: Entity> Paginated<T> for IndexedQuery<T> {
    fn options(&self) -> &QueryOptions {
        &self.opts
    }

    fn restart(&self, start: usize, page_size: usize) -> EngineResult<ResultSet<T>> {
        self.search(&self.opts.with_start(start).with_page_size(page_size))
    }

    fn restart_after(&self, cursor: &SearchAfter, page_size: usize) -> EngineResult<ResultSet<T>> {
        self.search(
            &self
                .opts
                .with_search_after(cursor.clone())
                .with_page_size(page_size),
        )
    }

    fn max_page_size(&self) -> usize {
        self.index.max_limit()
    }
}

impl<T: Entity> fmt::Display for IndexedQuery<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "index({})", self.query())
    }
}
