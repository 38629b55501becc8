//! Single-use result sets
//!
//! Reading a source is split in two phases: `read()` dispatches the request
//! and returns a `ResultSet`; consuming the set blocks for the results.
//! Consumption takes the set by value, so a set cannot be consumed twice.

use std::fmt;

use crate::error::EngineResult;

/// Opaque cursor for continuing a paginated read after its last result
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchAfter(String);

impl SearchAfter {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SearchAfter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Results plus the cursor to continue after them
pub type Page<I> = (Vec<I>, Option<SearchAfter>);

type Supplier<I> = Box<dyn FnOnce() -> EngineResult<Page<I>> + Send>;

enum Contents<I> {
    List(Vec<I>),
    Lazy(Supplier<I>),
    Closed,
}

/// One-shot, single-consumption sequence of results
pub struct ResultSet<I> {
    contents: Contents<I>,
    search_after: Option<SearchAfter>,
}

impl<I: Send + 'static> ResultSet<I> {
    /// Results that are already materialized
    pub fn from_list(items: Vec<I>) -> Self {
        Self {
            contents: Contents::List(items),
            search_after: None,
        }
    }

    /// Results computed on first consumption
    pub fn lazy<F>(supplier: F) -> Self
    where
        F: FnOnce() -> EngineResult<Vec<I>> + Send + 'static,
    {
        Self::lazy_page(move || supplier().map(|items| (items, None)))
    }

    /// Results and their continuation cursor computed on first consumption
    pub fn lazy_page<F>(supplier: F) -> Self
    where
        F: FnOnce() -> EngineResult<Page<I>> + Send + 'static,
    {
        Self {
            contents: Contents::Lazy(Box::new(supplier)),
            search_after: None,
        }
    }

    pub fn empty() -> Self {
        Self::from_list(Vec::new())
    }

    /// Attach the cursor to continue after these results
    pub fn with_search_after(mut self, cursor: Option<SearchAfter>) -> Self {
        self.search_after = cursor;
        self
    }

    pub fn search_after(&self) -> Option<&SearchAfter> {
        self.search_after.as_ref()
    }

    pub fn is_lazy(&self) -> bool {
        matches!(self.contents, Contents::Lazy(_))
    }

    /// Materialize every result
    ///
    /// A closed set yields no results.
    pub fn to_list(self) -> EngineResult<Vec<I>> {
        self.into_page().map(|(items, _)| items)
    }

    /// Materialize every result together with the continuation cursor
    ///
    /// A cursor computed by a lazy supplier wins over one attached up front.
    pub fn into_page(self) -> EngineResult<Page<I>> {
        match self.contents {
            Contents::List(items) => Ok((items, self.search_after)),
            Contents::Lazy(supplier) => {
                let (items, cursor) = supplier()?;
                Ok((items, cursor.or(self.search_after)))
            }
            Contents::Closed => Ok((Vec::new(), None)),
        }
    }

    /// Materialize and iterate
    pub fn into_iter(self) -> EngineResult<std::vec::IntoIter<I>> {
        self.to_list().map(Vec::into_iter)
    }

    /// Release the results without consuming them; safe to call repeatedly
    pub fn close(&mut self) {
        self.contents = Contents::Closed;
    }
}

impl<I> fmt::Debug for ResultSet<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.contents {
            Contents::List(items) => format!("List({})", items.len()),
            Contents::Lazy(_) => "Lazy".to_string(),
            Contents::Closed => "Closed".to_string(),
        };
        f.debug_struct("ResultSet")
            .field("contents", &state)
            .field("search_after", &self.search_after)
            .finish()
    }
}
