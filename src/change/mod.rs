//! Code-review change domain
//!
//! A concrete entity type wired through every layer of the engine: the
//! `Change` entity, the index schema it is stored under, the query operators
//! users type, the rules that normalize compiled queries and the visibility
//! predicate that hides private changes.

mod builder;
mod entity;
mod rules;
mod schema;
mod visibility;

pub use builder::ChangeQueryBuilder;
pub use entity::{Change, ChangeStatus};
pub use rules::change_rules;
pub use schema::{change_schema, SCHEMA_NAME, SCHEMA_VERSION};
pub use visibility::{visible_to, VISIBILITY_COST};
