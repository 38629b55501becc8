//! Secondary index backends
//!
//! An index answers predicate trees built from [`IndexPredicate`] leaves
//! (and AND/OR/NOT over them) with paginated result sets. The engine never
//! depends on a concrete backend; [`MemoryIndex`] is the in-process one.
//!
//! # Invariants
//!
//! - Results come back in a stable order, so offset restarts see no gaps
//! - A search-after cursor continues strictly after the last result it
//!   was returned with
//! - A read never returns more than `page_size` results
//!
//! [`IndexPredicate`]: crate::predicate::IndexPredicate

mod memory;

pub use memory::MemoryIndex;

use std::collections::BTreeSet;

use crate::entity::Entity;
use crate::error::EngineResult;
use crate::predicate::Predicate;
use crate::processor::QueryOptions;
use crate::schema::{FieldBundle, Schema};
use crate::source::ResultSet;

/// A searchable secondary index over entities of type `T`
pub trait Index<T: Entity>: Send + Sync {
    fn schema(&self) -> &Schema<T>;

    /// Hard maximum on the number of results one read may request
    fn max_limit(&self) -> usize;

    /// Dispatch a search; results are produced when the set is consumed
    fn search(&self, pred: &Predicate<T>, opts: &QueryOptions) -> EngineResult<ResultSet<T>>;

    /// Dispatch a search returning stored field values
    ///
    /// Reads the fields named in the options, or every stored field when
    /// none are named.
    fn search_raw(
        &self,
        pred: &Predicate<T>,
        opts: &QueryOptions,
    ) -> EngineResult<ResultSet<FieldBundle>>;

    /// Estimated number of entities matching `pred`
    fn cardinality(&self, pred: &Predicate<T>) -> u64;
}

/// Fields a raw read should return
pub(crate) fn requested_fields<T: Entity>(schema: &Schema<T>, opts: &QueryOptions) -> BTreeSet<String> {
    if opts.fields().is_empty() {
        schema.stored_fields()
    } else {
        opts.fields().clone()
    }
}
