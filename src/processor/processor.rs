//! Query processor for querydex
//!
//! Executes compiled predicates against one index, producing bounded,
//! visibility-filtered results.
//!
//! Execution flow (per query, in order):
//! 1. Negotiate the effective limit
//! 2. Build options asking for one result more than the limit
//! 3. Rewrite the predicate into data sources
//! 4. Wrap it with the visibility predicate, unless disabled
//! 5. Dispatch the read
//!
//! Every query is dispatched before any result set is consumed; results are
//! then materialized in order and truncated to each query's own limit.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::config::IndexConfig;
use crate::entity::Entity;
use crate::error::{EngineError, EngineResult};
use crate::index::Index;
use crate::observability::{log_event, Event, MetricsRegistry, QueryScope};
use crate::predicate::Predicate;
use crate::query::{QueryBuilder, QueryParseError};
use crate::rewrite::Rewriter;
use crate::source::{AndSource, DataSource, FilteredSource, PaginatingSource, ResultSet};

use super::options::QueryOptions;
use super::result::QueryResult;

/// Lifecycle of a processor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    /// Options may still change; nothing has run
    Configured,
    /// Visibility is enforced with nothing permitted; every query is empty
    Disabled,
    /// A query batch has run; the processor cannot be used again
    Executed,
}

struct Dispatched<T: Entity> {
    scope: QueryScope,
    query: Option<String>,
    predicate: Predicate<T>,
    limit: usize,
    results: ResultSet<T>,
}

/// One-shot executor of query batches against an index
pub struct QueryProcessor<T: Entity> {
    index: Arc<dyn Index<T>>,
    rewriter: Arc<dyn Rewriter<T>>,
    config: Arc<IndexConfig>,
    start: usize,
    user_limit: usize,
    permitted_limit: usize,
    fields: BTreeSet<String>,
    enforce_visibility: bool,
    visibility: Option<Predicate<T>>,
    no_limit: bool,
    state: ProcessorState,
}

impl<T: Entity> QueryProcessor<T> {
    /// Creates a processor; the permitted limit starts at the configured
    /// maximum and visibility is enforced
    pub fn new(index: Arc<dyn Index<T>>, rewriter: Arc<dyn Rewriter<T>>, config: Arc<IndexConfig>) -> Self {
        let permitted_limit = config.max_limit;
        Self {
            index,
            rewriter,
            config,
            start: 0,
            user_limit: 0,
            permitted_limit,
            fields: BTreeSet::new(),
            enforce_visibility: true,
            visibility: None,
            no_limit: false,
            state: ProcessorState::Configured,
        }
    }

    /// Number of leading results to skip
    pub fn with_start(mut self, start: usize) -> Self {
        self.start = start;
        self
    }

    /// Limit requested by the user; 0 means none
    pub fn with_user_limit(mut self, limit: usize) -> Self {
        self.user_limit = limit;
        self
    }

    /// Most results the caller may see
    pub fn with_permitted_limit(mut self, limit: usize) -> Self {
        self.permitted_limit = limit;
        self
    }

    /// Stored fields raw reads should return
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = String>) -> Self {
        self.fields = fields.into_iter().collect();
        self
    }

    /// Predicate deciding which entities the caller may see
    pub fn with_visibility(mut self, visibility: Predicate<T>) -> Self {
        self.visibility = Some(visibility);
        self
    }

    pub fn enforce_visibility(mut self, enforce: bool) -> Self {
        self.enforce_visibility = enforce;
        self
    }

    /// Ignore permitted and user limits; for internal callers
    pub fn enforce_no_limit(mut self) -> Self {
        self.no_limit = true;
        self
    }

    pub fn state(&self) -> ProcessorState {
        self.state
    }

    /// Whether every query returns empty results without reading
    pub fn is_disabled(&self) -> bool {
        self.enforce_visibility && self.permitted_limit == 0
    }

    /// Limit applied to `pred`, excluding the extra result requested to
    /// detect more
    pub fn effective_limit(&self, pred: &Predicate<T>) -> usize {
        let backend = self.index.max_limit();
        if self.no_limit {
            return backend.saturating_sub(1);
        }
        let mut limit = backend.min(self.permitted_limit);
        if self.user_limit > 0 {
            limit = limit.min(self.user_limit);
        }
        if let Some(embedded) = pred.find_limit() {
            limit = limit.min(embedded);
        }
        if limit == backend {
            limit -= 1;
        }
        limit
    }

    pub fn query(&mut self, pred: Predicate<T>) -> EngineResult<QueryResult<T>> {
        let mut results = self.run(vec![(None, pred)])?;
        results
            .pop()
            .ok_or_else(|| EngineError::InvalidOptions("no result for query".to_string()))
    }

    pub fn query_all(&mut self, preds: Vec<Predicate<T>>) -> EngineResult<Vec<QueryResult<T>>> {
        self.run(preds.into_iter().map(|p| (None, p)).collect())
    }

    /// Compile each query with `builder`, then run them as one batch
    ///
    /// Each result records the text it was compiled from.
    pub fn query_strings<B: QueryBuilder<T>>(
        &mut self,
        builder: &B,
        queries: &[&str],
    ) -> EngineResult<Vec<QueryResult<T>>> {
        let mut compiled = Vec::with_capacity(queries.len());
        for query in queries {
            compiled.push((Some(query.to_string()), builder.parse(query)?));
        }
        self.run(compiled)
    }

    fn run(&mut self, queries: Vec<(Option<String>, Predicate<T>)>) -> EngineResult<Vec<QueryResult<T>>> {
        match self.state {
            ProcessorState::Executed => return Err(EngineError::ProcessorReused),
            ProcessorState::Disabled => return Ok(self.disabled_results(queries)),
            ProcessorState::Configured if self.is_disabled() => {
                self.state = ProcessorState::Disabled;
                return Ok(self.disabled_results(queries));
            }
            ProcessorState::Configured => self.state = ProcessorState::Executed,
        }

        let mut dispatched = Vec::with_capacity(queries.len());
        for (query, pred) in queries {
            let scope = QueryScope::new(query.clone().unwrap_or_else(|| pred.to_string()));
            match self.dispatch(&pred) {
                Ok((predicate, limit, results)) => dispatched.push(Dispatched {
                    scope,
                    query,
                    predicate,
                    limit,
                    results,
                }),
                Err(e) => {
                    scope.fail(e.code(), &e.to_string());
                    return Err(e);
                }
            }
        }

        let metrics = MetricsRegistry::global();
        let mut out = Vec::with_capacity(dispatched.len());
        for d in dispatched {
            let entities = match d.results.to_list() {
                Ok(entities) => entities,
                Err(e) => {
                    d.scope.fail(e.code(), &e.to_string());
                    return Err(e);
                }
            };
            let result = QueryResult::create(d.query, d.predicate, d.limit, entities);
            metrics.increment_queries_executed();
            metrics.add_results_returned(result.len() as u64);
            if result.more() {
                metrics.increment_queries_truncated();
            }
            d.scope.complete(result.len(), result.more());
            out.push(result);
        }
        Ok(out)
    }

    fn disabled_results(&self, queries: Vec<(Option<String>, Predicate<T>)>) -> Vec<QueryResult<T>> {
        let metrics = MetricsRegistry::global();
        queries
            .into_iter()
            .map(|(query, pred)| {
                metrics.increment_queries_disabled();
                let label = query.clone().unwrap_or_else(|| pred.to_string());
                log_event(Event::QueryDisabled, &[("query", label.as_str())]);
                QueryResult::empty(query, pred)
            })
            .collect()
    }

    /// Rewrite one query and start its read
    fn dispatch(&self, pred: &Predicate<T>) -> EngineResult<(Predicate<T>, usize, ResultSet<T>)> {
        let limit = self.effective_limit(pred);
        if limit == 0 {
            return Err(EngineError::InvalidOptions(
                "effective limit must be positive".to_string(),
            ));
        }
        self.check_max_pages(limit)?;

        let opts = QueryOptions::new(
            Arc::clone(&self.config),
            self.start,
            self.initial_page_size(limit) + 1,
            limit + 1,
            self.fields.clone(),
        )?;
        let mut rewritten = self.rewriter.rewrite(pred, &opts)?;
        if self.enforce_visibility {
            rewritten = self.with_visibility_filter(rewritten, &opts)?;
        }
        let results = self.read(&rewritten)?;
        Ok((rewritten, limit, results))
    }

    fn initial_page_size(&self, limit: usize) -> usize {
        match self.config.initial_page_size {
            0 => limit,
            size => size.min(limit),
        }
    }

    fn check_max_pages(&self, limit: usize) -> EngineResult<()> {
        let max = self.config.max_pages;
        let page = self.start / limit + 1;
        if max > 0 && page > max {
            return Err(QueryParseError::invalid_value(
                "start",
                self.start.to_string(),
                format!("Cannot go beyond page {} of results", max),
            )
            .into());
        }
        Ok(())
    }

    fn with_visibility_filter(&self, pred: Predicate<T>, opts: &QueryOptions) -> EngineResult<Predicate<T>> {
        let visibility = self.visibility.clone().ok_or_else(|| {
            EngineError::InvalidOptions(
                "visibility is enforced but no visibility predicate is set".to_string(),
            )
        })?;
        Ok(Predicate::new(AndSource::new(vec![pred, visibility], opts.clone())?))
    }

    /// Read through the outermost source, which applies `start`
    fn read(&self, pred: &Predicate<T>) -> EngineResult<ResultSet<T>> {
        let ds = pred
            .as_data_source()
            .ok_or_else(|| EngineError::NoDataSource(pred.to_string()))?;
        if pred.is::<AndSource<T>>() {
            ds.read()
        } else if ds.as_paginated().is_some() {
            PaginatingSource::new(pred.clone(), self.start)?.read()
        } else {
            FilteredSource::new(pred.clone(), None, self.start)?.read()
        }
    }
}
