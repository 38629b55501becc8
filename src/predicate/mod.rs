//! Predicate algebra
//!
//! Immutable boolean expression trees over entities of type `T`.
//!
//! # Invariants
//!
//! - `and`/`or` flatten children of the same combinator
//! - `not(not(p))` is `p`
//! - AND/OR cost is the sum of child costs; NOT costs what its child costs
//! - equality is structural: node kind, leaf name and value, children
//! - `matches` on a node that cannot evaluate in memory is an error

mod combinators;
mod index;
mod limit;
mod node;
mod operator;
mod range;

pub use combinators::{AndPredicate, AnyPredicate, NotPredicate, OrPredicate};
pub use index::IndexPredicate;
pub use limit::LimitPredicate;
pub use node::{NodeKind, Predicate, PredicateNode};
pub use operator::{is_single_word, write_leaf, MatchFn, MatchablePredicate, OperatorPredicate};
pub use range::{parse_age, parse_timestamp, tokenize, IntRange, TimestampRange};

pub(crate) use combinators::{sum_cost, write_joined};
