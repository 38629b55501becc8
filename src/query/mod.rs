//! Query language
//!
//! Query text is lexed and parsed into a [`QueryNode`] tree, which a
//! [`QueryBuilder`] compiles into a predicate by applying the operators of
//! its [`OperatorRegistry`].
//!
//! ```text
//! status:open -is:private (owner:alice OR owner:bob) topic:"big change"
//! ```
//!
//! Rewrite patterns use the same grammar plus variables (`Name=(...)`,
//! `$Name`) and operator wildcards (`field:*`).

mod builder;
mod errors;
mod parser;
mod registry;
mod tree;

pub use builder::QueryBuilder;
pub use errors::{ParseResult, QueryParseError};
pub use parser::{parse, parse_pattern};
pub use registry::{Operator, OperatorFn, OperatorRegistry, RegistryBuilder};
pub use tree::{FieldArg, QueryNode, Term};
