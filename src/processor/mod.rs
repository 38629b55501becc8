//! Query processor subsystem
//!
//! Turns compiled predicates into bounded, visibility-filtered results.
//!
//! # Lifecycle
//!
//! A [`QueryProcessor`] is configured (start, limits, fields, visibility),
//! then runs exactly one batch of queries. A processor that enforces
//! visibility with a permitted limit of 0 is disabled: every query returns
//! an empty result and the index is never read.
//!
//! # Limits
//!
//! The effective limit is the smallest of the backend maximum, the permitted
//! limit, the user limit (when positive) and any `limit:` in the query. One
//! extra result is always requested so `more` can be reported without a
//! second read.

mod options;
mod processor;
mod result;

pub use options::QueryOptions;
pub use processor::{ProcessorState, QueryProcessor};
pub use result::QueryResult;
