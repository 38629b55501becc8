//! Single-read source with an optional in-memory filter

use super::result_set::ResultSet;
use super::DataSource;
use crate::entity::Entity;
use crate::error::{EngineError, EngineResult};
use crate::observability::{log_event, Event, MetricsRegistry};
use crate::predicate::Predicate;

/// Reads `source` once, drops entities rejected by `filter` and skips
/// the first `start` survivors
///
/// Never restarts the source; a filtered page may come back short.
pub struct FilteredSource<T: Entity> {
    source: Predicate<T>,
    filter: Option<Predicate<T>>,
    start: usize,
}

impl<T: Entity> FilteredSource<T> {
    pub fn new(source: Predicate<T>, filter: Option<Predicate<T>>, start: usize) -> EngineResult<Self> {
        if !source.is_data_source() {
            return Err(EngineError::NoDataSource(source.to_string()));
        }
        if let Some(filter) = &filter {
            if !filter.is_matchable() {
                return Err(EngineError::NotMatchable(filter.to_string()));
            }
        }
        Ok(Self {
            source,
            filter,
            start,
        })
    }

    fn data_source(&self) -> EngineResult<&dyn DataSource<T>> {
        self.source
            .as_data_source()
            .ok_or_else(|| EngineError::NoDataSource(self.source.to_string()))
    }
}

impl<T: Entity> DataSource<T> for FilteredSource<T> {
    fn cardinality(&self) -> u64 {
        self.data_source().map_or(0, |ds| ds.cardinality())
    }

    fn read(&self) -> EngineResult<ResultSet<T>> {
        let label = self.source.to_string();
        log_event(Event::SourceDispatched, &[("source", label.as_str()), ("kind", "filtered")]);
        let results = self.data_source()?.read()?;

        let filter = self.filter.clone();
        let start = self.start;
        Ok(ResultSet::lazy(move || {
            let mut kept = Vec::new();
            let mut dropped = 0u64;
            for entity in results.to_list()? {
                let keep = match &filter {
                    Some(filter) => filter.matches(&entity)?,
                    None => true,
                };
                if keep {
                    kept.push(entity);
                } else {
                    dropped += 1;
                }
            }
            MetricsRegistry::global().add_entities_filtered(dropped);
            Ok(kept.into_iter().skip(start).collect())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::OperatorPredicate;
    use crate::source::testing::{ids, items, list_source, not_third, options, Item};
    use std::sync::atomic::Ordering;

    #[test]
    fn test_filters_then_skips_start() {
        let (source, reads) = list_source("all", items(1..=10), options(0, 10, 10));
        let filtered = FilteredSource::new(source, Some(not_third()), 2).unwrap();
        let got = filtered.read().unwrap().to_list().unwrap();
        assert_eq!(ids(&got), vec![4, 5, 7, 8, 10]);
        assert_eq!(reads.load(Ordering::SeqCst), 1);
    }

    /// A short page is returned as is; the source is never re-read.
    #[test]
    fn test_never_restarts() {
        let (source, reads) = list_source("all", items(1..=100), options(0, 6, 6));
        let filtered = FilteredSource::new(source, Some(not_third()), 0).unwrap();
        assert_eq!(filtered.read().unwrap().to_list().unwrap().len(), 4);
        assert_eq!(reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_without_filter() {
        let (source, _) = list_source("all", items(1..=5), options(0, 5, 5));
        let filtered = FilteredSource::new(source, None, 3).unwrap();
        assert_eq!(ids(&filtered.read().unwrap().to_list().unwrap()), vec![4, 5]);
        assert_eq!(filtered.cardinality(), 5);
    }

    #[test]
    fn test_requires_data_source() {
        let opaque: Predicate<Item> = Predicate::new(OperatorPredicate::new("opaque", "x"));
        let err = FilteredSource::new(opaque, None, 0).err().unwrap();
        assert_eq!(err.code(), "QDX_NO_DATA_SOURCE");
    }
}
