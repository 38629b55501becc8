//! Union of several data sources

use std::any::Any;
use std::collections::HashSet;
use std::fmt;

use super::pages::{self, FirstPage, RestartPolicy};
use super::result_set::ResultSet;
use super::DataSource;
use crate::entity::Entity;
use crate::error::{EngineError, EngineResult};
use crate::observability::{log_event, Event};
use crate::predicate::{sum_cost, write_joined, NodeKind, Predicate, PredicateNode};

/// An OR whose children are all data sources
///
/// Every child is read; results are concatenated in child order with
/// duplicates (by entity id) dropped after their first occurrence.
/// Paginated children are re-read until they reach their own limit.
pub struct OrSource<T: Entity> {
    children: Vec<Predicate<T>>,
    cardinality: u64,
}

impl<T: Entity> OrSource<T> {
    pub fn new(children: Vec<Predicate<T>>) -> EngineResult<Self> {
        let mut flat = Vec::with_capacity(children.len());
        for child in children {
            if child.is::<OrSource<T>>() {
                flat.extend(child.children().iter().cloned());
            } else {
                flat.push(child);
            }
        }
        if flat.is_empty() {
            return Err(EngineError::InvalidPredicate(
                "OR source requires at least one child".to_string(),
            ));
        }

        let mut cardinality = 0u64;
        for child in &flat {
            let ds = child
                .as_data_source()
                .ok_or_else(|| EngineError::NoDataSource(child.to_string()))?;
            cardinality = cardinality.saturating_add(ds.cardinality());
        }
        Ok(Self {
            children: flat,
            cardinality,
        })
    }
}

impl<T: Entity> PredicateNode<T> for OrSource<T> {
    fn kind(&self) -> NodeKind<'_> {
        NodeKind::Or
    }

    fn children(&self) -> &[Predicate<T>] {
        &self.children
    }

    fn copy(&self, children: Vec<Predicate<T>>) -> EngineResult<Predicate<T>> {
        Ok(Predicate::new(OrSource::new(children)?))
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

impl<T: Entity> DataSource<T> for OrSource<T> {
    fn cardinality(&self) -> u64 {
        self.cardinality
    }

    fn read(&self) -> EngineResult<ResultSet<T>> {
        let mut pending = Vec::with_capacity(self.children.len());
        for child in &self.children {
            let ds = child
                .as_data_source()
                .ok_or_else(|| EngineError::NoDataSource(child.to_string()))?;
            let name = child.to_string();
            log_event(Event::SourceDispatched, &[("source", name.as_str()), ("kind", "or")]);
            pending.push((child.clone(), ds.read()?));
        }

        Ok(ResultSet::lazy(move || {
            let mut seen = HashSet::new();
            let mut merged = Vec::new();
            for (child, results) in pending {
                for entity in drain(&child, results)? {
                    if seen.insert(entity.id()) {
                        merged.push(entity);
                    }
                }
            }
            Ok(merged)
        }))
    }
}

fn drain<T: Entity>(child: &Predicate<T>, results: ResultSet<T>) -> EngineResult<Vec<T>> {
    let Some(opts) = child
        .as_data_source()
        .and_then(|ds| ds.as_paginated())
        .map(|p| p.options().clone())
    else {
        return results.to_list();
    };
    let first = FirstPage {
        results,
        start: opts.start(),
        page_size: opts.page_size(),
    };
    pages::collect(
        &child.to_string(),
        child,
        first,
        &[],
        opts.limit(),
        RestartPolicy::UntilSatisfied,
        &opts,
    )
}

impl<T: Entity> fmt::Display for OrSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("or_source")?;
        write_joined(f, &self.children, " OR ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::OperatorPredicate;
    use crate::source::testing::{ids, items, list_source, options, Item, ListSource};
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    #[test]
    fn test_union_deduplicates_by_id() {
        let (a, _) = list_source("a", items([1, 2, 3]), options(0, 10, 10));
        let (b, _) = list_source("b", items([3, 4, 1, 5]), options(0, 10, 10));
        let or = OrSource::new(vec![a, b]).unwrap();
        assert_eq!(DataSource::cardinality(&or), 7);
        let got = or.read().unwrap().to_list().unwrap();
        assert_eq!(ids(&got), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_every_child_dispatched_before_consumption() {
        let (a, reads_a) = list_source("a", items([1]), options(0, 10, 10));
        let (b, reads_b) = list_source("b", items([2]), options(0, 10, 10));
        let or = OrSource::new(vec![a, b]).unwrap();
        let rs = or.read().unwrap();
        assert_eq!(reads_a.load(Ordering::SeqCst), 1);
        assert_eq!(reads_b.load(Ordering::SeqCst), 1);
        assert_eq!(rs.to_list().unwrap().len(), 2);
    }

    #[test]
    fn test_rejects_non_source_child() {
        let (a, _) = list_source("a", items([1]), options(0, 10, 10));
        let opaque: Predicate<Item> = Predicate::new(OperatorPredicate::new("opaque", "x"));
        let err = OrSource::new(vec![a, opaque]).err().unwrap();
        assert_eq!(err, EngineError::NoDataSource("opaque:x".into()));
    }

    /// A child capped below its limit is read again until the limit is met.
    #[test]
    fn test_capped_child_is_drained() {
        let capped = ListSource::new("capped", items(1..=30), options(0, 12, 12)).with_cap(5);
        let reads = Arc::clone(&capped.reads);
        let (other, _) = list_source("other", items([40]), options(0, 12, 12));
        let or = OrSource::new(vec![Predicate::new(capped), other]).unwrap();

        let got = or.read().unwrap().to_list().unwrap();
        assert_eq!(ids(&got), (1..=12).chain([40]).collect::<Vec<_>>());
        assert_eq!(reads.load(Ordering::SeqCst), 3);
    }
}
