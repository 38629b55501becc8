//! Observability for the query engine
//!
//! - Structured logging (JSON lines on stderr)
//! - Counters
//! - Query lifecycle events
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on query results
//! 3. No async or background threads
//! 4. Deterministic output
//!
//! # Usage
//!
//! ```ignore
//! use querydex::observability::{log_event, Event, MetricsRegistry};
//!
//! log_event(Event::QueryParsed, &[("query", "status:open")]);
//! MetricsRegistry::global().increment_queries_executed();
//! ```

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::{QueryScope, Timer};

/// Log a lifecycle event at its own severity
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
