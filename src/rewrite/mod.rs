//! Predicate rewriting
//!
//! Two stages run between compilation and execution:
//!
//! 1. [`RuleRewriter`] applies named pattern rules until the tree stops
//!    changing. Patterns are predicate trees with variables (`S=(status:*)`,
//!    `$X`) and operator wildcards (`status:*`), usually compiled from text
//!    with [`QueryBuilder::compile_pattern`].
//! 2. [`IndexRewriter`] splits the result into index requests and in-memory
//!    filters, producing the data source the processor reads.
//!
//! Rule application is pure; rewriting never touches the index.
//!
//! [`QueryBuilder::compile_pattern`]: crate::query::QueryBuilder::compile_pattern

mod errors;
mod index_rewriter;
mod pattern;
mod rewriter;
mod rule;

pub use errors::{RewriteError, RewriteResult};
pub use index_rewriter::IndexRewriter;
pub use pattern::{match_pattern, PatternMatch, VariablePredicate, WildcardPredicate};
pub use rewriter::{Rewriter, RuleRewriter};
pub use rule::{Bindings, Captures, CostPolicy, Replacement, Rule};
