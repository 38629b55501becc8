//! Searchable entity contract

use std::fmt::Debug;
use std::hash::Hash;

/// An entity that can be indexed and queried
///
/// Entities are cloned out of the index into result sets, so they are
/// expected to be cheap to clone or reference counted.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Identity used to de-duplicate results across sources
    type Id: Clone + Eq + Hash + Debug + Send + Sync;

    fn id(&self) -> Self::Id;
}
