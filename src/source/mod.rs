//! Data sources and result sets
//!
//! A data source is a predicate the index can answer. Sources compose:
//! - `IndexedQuery`: a predicate tree handed to the index as one request
//! - `AndSource`: one source post-filtered by in-memory predicates
//! - `OrSource`: the de-duplicated union of several sources
//! - `PaginatingSource` / `FilteredSource`: outermost wrappers applying
//!   the caller's start offset
//!
//! # Restart-on-skip pagination
//!
//! Post-filtering drops entities, so a page read from the index can yield
//! fewer matches than requested. Sources that support restarting are re-read
//! from the next unseen offset (or cursor) with a growing page size until
//! enough matches are collected, the source is exhausted, or the configured
//! restart cap is reached.

mod and_source;
mod cardinal;
mod filtered;
mod indexed;
mod or_source;
mod pages;
mod paginating;
mod result_set;

pub use and_source::AndSource;
pub use cardinal::{AndCardinalPredicate, OrCardinalPredicate};
pub use filtered::FilteredSource;
pub use indexed::IndexedQuery;
pub use or_source::OrSource;
pub use paginating::PaginatingSource;
pub use result_set::{Page, ResultSet, SearchAfter};

use crate::entity::Entity;
use crate::error::{EngineError, EngineResult};
use crate::processor::QueryOptions;
use crate::schema::FieldBundle;

/// Something the index can produce results for
pub trait DataSource<T: Entity>: Send + Sync {
    /// Estimated upper bound on the number of results
    fn cardinality(&self) -> u64;

    /// Dispatch the read; results are produced when the set is consumed
    fn read(&self) -> EngineResult<ResultSet<T>>;

    /// Dispatch a read of stored field values instead of entities
    fn read_raw(&self) -> EngineResult<ResultSet<FieldBundle>> {
        Err(EngineError::Unsupported("raw reads".to_string()))
    }

    fn as_paginated(&self) -> Option<&dyn Paginated<T>> {
        None
    }
}

/// A source that can be re-read from a later position
pub trait Paginated<T: Entity>: DataSource<T> {
    /// Options of the initial read
    fn options(&self) -> &QueryOptions;

    /// Re-read starting at offset `start`
    fn restart(&self, start: usize, page_size: usize) -> EngineResult<ResultSet<T>>;

    /// Re-read starting after `cursor`
    fn restart_after(&self, cursor: &SearchAfter, page_size: usize) -> EngineResult<ResultSet<T>>;

    /// Most entities one read returns, whatever page size is asked for
    fn max_page_size(&self) -> usize {
        usize::MAX
    }
}
