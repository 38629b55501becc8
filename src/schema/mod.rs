//! Index schema subsystem
//!
//! Field definitions are given, not migrated: a schema is declared once per
//! entity type and consumed by index predicates for in-memory matching and by
//! raw reads when no explicit field list is requested.
//!
//! # Design Principles
//!
//! - Fields are typed; the type decides how a predicate matches
//! - Schemas are immutable once built
//! - Raw reads only expose stored fields

mod bundle;
mod errors;
mod field;
mod index_schema;
mod types;

pub use bundle::FieldBundle;
pub use errors::{SchemaError, SchemaResult};
pub use field::{FieldDef, FieldGetter};
pub use index_schema::{Schema, SchemaBuilder};
pub use types::{FieldType, FieldValue};
