//! querydex - a typed query language and paginated index query engine
//!
//! Query text is compiled into a predicate tree by a `QueryBuilder`,
//! normalized by rewrite rules, split into index-backed data sources and
//! in-memory filters, and executed by a `QueryProcessor` that negotiates
//! result limits and enforces visibility.

pub mod change;
pub mod cli;
pub mod config;
pub mod entity;
pub mod error;
pub mod index;
pub mod observability;
pub mod predicate;
pub mod processor;
pub mod query;
pub mod rewrite;
pub mod schema;
pub mod source;
