//! Outermost wrapper that restarts a paginated source until the limit is met

use super::pages::{self, FirstPage, RestartPolicy};
use super::result_set::ResultSet;
use super::DataSource;
use crate::entity::Entity;
use crate::error::{EngineError, EngineResult};
use crate::observability::{log_event, Event};
use crate::predicate::Predicate;

/// Reads `source` and keeps restarting it with a growing page size until
/// its requested limit is reached or it runs dry, then skips `start`
///
/// The wrapped source carries backend options (offset 0, limit
/// `start + limit + 1`), so skipping `start` here yields the caller's page.
pub struct PaginatingSource<T: Entity> {
    source: Predicate<T>,
    start: usize,
}

impl<T: Entity> PaginatingSource<T> {
    pub fn new(source: Predicate<T>, start: usize) -> EngineResult<Self> {
        if !source.is_data_source() {
            return Err(EngineError::NoDataSource(source.to_string()));
        }
        Ok(Self { source, start })
    }

    fn data_source(&self) -> EngineResult<&dyn DataSource<T>> {
        self.source
            .as_data_source()
            .ok_or_else(|| EngineError::NoDataSource(self.source.to_string()))
    }
}

impl<T: Entity> DataSource<T> for PaginatingSource<T> {
    fn cardinality(&self) -> u64 {
        self.data_source().map_or(0, |ds| ds.cardinality())
    }

    fn read(&self) -> EngineResult<ResultSet<T>> {
        let ds = self.data_source()?;
        let label = self.source.to_string();
        log_event(Event::SourceDispatched, &[("source", label.as_str()), ("kind", "paginating")]);
        let first = ds.read()?;

        let start = self.start;
        let Some(paginated) = ds.as_paginated() else {
            return Ok(ResultSet::lazy(move || {
                Ok(first.to_list()?.into_iter().skip(start).collect())
            }));
        };
        let opts = paginated.options().clone();
        let source = self.source.clone();
        Ok(ResultSet::lazy(move || {
            let first = FirstPage {
                results: first,
                start: opts.start(),
                page_size: opts.page_size(),
            };
            let collected = pages::collect(
                &label,
                &source,
                first,
                &[],
                opts.limit(),
                RestartPolicy::UntilSatisfied,
                &opts,
            )?;
            Ok(collected.into_iter().skip(start).collect())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexConfig;
    use crate::source::testing::{ids, items, list_source, options, options_with};
    use std::sync::atomic::Ordering;

    /// Pages of 4 are re-read until the limit of 10 is filled.
    #[test]
    fn test_restarts_until_limit() {
        let (source, reads) = list_source("all", items(1..=50), options(0, 10, 4));
        let paginating = PaginatingSource::new(source, 0).unwrap();
        let got = paginating.read().unwrap().to_list().unwrap();
        assert_eq!(ids(&got), (1..=10).collect::<Vec<_>>());
        assert_eq!(reads.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_skips_start() {
        let (source, _) = list_source("all", items(1..=50), options(0, 8, 8));
        let paginating = PaginatingSource::new(source, 5).unwrap();
        assert_eq!(ids(&paginating.read().unwrap().to_list().unwrap()), vec![6, 7, 8]);
    }

    /// With a multiplier of 2 each restart doubles the page size.
    #[test]
    fn test_page_size_grows() {
        let config = IndexConfig {
            page_size_multiplier: 2,
            ..IndexConfig::default()
        };
        let (source, reads) = list_source("all", items(1..=100), options_with(config, 0, 14, 2));
        let paginating = PaginatingSource::new(source, 0).unwrap();
        assert_eq!(paginating.read().unwrap().to_list().unwrap().len(), 14);
        // pages of 2, 4, 8
        assert_eq!(reads.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_stops_when_exhausted() {
        let (source, _) = list_source("few", items(1..=3), options(0, 10, 2));
        let paginating = PaginatingSource::new(source, 0).unwrap();
        assert_eq!(paginating.read().unwrap().to_list().unwrap().len(), 3);
    }
}
