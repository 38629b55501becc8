//! Conjunction read from one child source and post-filtered by the rest

use std::any::Any;
use std::cmp::Ordering;
use std::fmt;

use super::pages::{self, FirstPage, RestartPolicy};
use super::result_set::ResultSet;
use super::DataSource;
use crate::entity::Entity;
use crate::error::{EngineError, EngineResult};
use crate::observability::{log_event, Event};
use crate::predicate::{sum_cost, write_joined, NodeKind, Predicate, PredicateNode};
use crate::processor::QueryOptions;

/// Data sources first, then cheaper, then smaller
fn compare_children<T: Entity>(a: &Predicate<T>, b: &Predicate<T>) -> Ordering {
    b.is_data_source()
        .cmp(&a.is_data_source())
        .then_with(|| a.estimate_cost().cmp(&b.estimate_cost()))
        .then_with(|| {
            let ca = a.cardinality().unwrap_or(u64::MAX);
            let cb = b.cardinality().unwrap_or(u64::MAX);
            ca.cmp(&cb)
        })
}

/// An AND whose first data-source child (in cost order) produces the
/// results and whose remaining children filter them in memory
pub struct AndSource<T: Entity> {
    children: Vec<Predicate<T>>,
    source: usize,
    cardinality: u64,
    opts: QueryOptions,
}

impl<T: Entity> AndSource<T> {
    /// Build from children; at least one must be a data source and every
    /// other child must be matchable
    pub fn new(children: Vec<Predicate<T>>, opts: QueryOptions) -> EngineResult<Self> {
        let mut flat = Vec::with_capacity(children.len());
        for child in children {
            if child.is::<AndSource<T>>() {
                flat.extend(child.children().iter().cloned());
            } else {
                flat.push(child);
            }
        }
        flat.sort_by(compare_children);

        let source = flat
            .iter()
            .position(Predicate::is_data_source)
            .ok_or_else(|| {
                EngineError::NoDataSource(format!("no child of {} is a data source", Joined(&flat)))
            })?;
        if let Some(p) = flat
            .iter()
            .enumerate()
            .find(|(i, p)| *i != source && !p.is_matchable())
            .map(|(_, p)| p)
        {
            return Err(EngineError::NotMatchable(p.to_string()));
        }

        let cardinality = flat
            .iter()
            .filter_map(|p| p.as_data_source().map(|ds| ds.cardinality()))
            .min()
            .unwrap_or(u64::MAX);

        Ok(Self {
            children: flat,
            source,
            cardinality,
            opts,
        })
    }

    /// The child that produces results
    pub fn source(&self) -> &Predicate<T> {
        &self.children[self.source]
    }

    pub fn options(&self) -> &QueryOptions {
        &self.opts
    }

    fn filters(&self) -> Vec<Predicate<T>> {
        self.children
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != self.source)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

impl<T: Entity> PredicateNode<T> for AndSource<T> {
    fn kind(&self) -> NodeKind<'_> {
        NodeKind::And
    }

    fn children(&self) -> &[Predicate<T>] {
        &self.children
    }

    fn copy(&self, children: Vec<Predicate<T>>) -> EngineResult<Predicate<T>> {
        Ok(Predicate::new(AndSource::new(children, self.opts.clone())?))
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

    fn as_data_source(&self) -> Option<&dyn DataSource<T>> {
        Some(self)
    }

    fn cardinality(&self) -> Option<u64> {
        Some(self.cardinality)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T: Entity> DataSource<T> for AndSource<T> {
    fn cardinality(&self) -> u64 {
        self.cardinality
    }

    fn read(&self) -> EngineResult<ResultSet<T>> {
        let source = self.source().clone();
        let ds = source
            .as_data_source()
            .ok_or_else(|| EngineError::NoDataSource(source.to_string()))?;
        let (first_start, first_page_size) = match ds.as_paginated() {
            Some(p) => (p.options().start(), p.options().page_size()),
            None => (0, usize::MAX),
        };

        let label = source.to_string();
        log_event(Event::SourceDispatched, &[("source", label.as_str()), ("kind", "and")]);
        let first = ds.read()?;

        let filters = self.filters();
        let opts = self.opts.clone();
        Ok(ResultSet::lazy(move || {
            let start = opts.start();
            let needed = start.saturating_add(opts.limit());
            let first = FirstPage {
                results: first,
                start: first_start,
                page_size: first_page_size,
            };
            let matched = pages::collect(
                &label,
                &source,
                first,
                &filters,
                needed,
                RestartPolicy::OnSkip,
                &opts,
            )?;
            Ok(matched.into_iter().skip(start).collect())
        }))
    }
}

impl<T: Entity> fmt::Display for AndSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("and_source")?;
        write_joined(f, &self.children, " ")
    }
}

struct Joined<'a, T: Entity>(&'a [Predicate<T>]);

impl<T: Entity> fmt::Display for Joined<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_joined(f, self.0, " ")
    }
}
