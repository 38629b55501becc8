//! Query lifecycle events
//!
//! Events are explicit and typed; each carries its own severity.

use std::fmt;

use super::logger::Severity;

/// Observable events of the query engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Query text compiled into a predicate
    QueryParsed,
    /// Predicate rewritten into data sources
    QueryRewritten,
    /// Processor disabled; no source was read
    QueryDisabled,
    /// A data source read was dispatched
    SourceDispatched,
    /// A paginated source was re-read from a later position
    SourceRestarted,
    /// A restart loop stopped at the configured cap
    RestartCapReached,
    /// Results materialized
    QueryCompleted,
    /// Query compilation, rewrite or read failed
    QueryFailed,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::QueryParsed => "QUERY_PARSED",
            Event::QueryRewritten => "QUERY_REWRITTEN",
            Event::QueryDisabled => "QUERY_DISABLED",
            Event::SourceDispatched => "SOURCE_DISPATCHED",
            Event::SourceRestarted => "SOURCE_RESTARTED",
            Event::RestartCapReached => "RESTART_CAP_REACHED",
            Event::QueryCompleted => "QUERY_COMPLETE",
            Event::QueryFailed => "QUERY_FAILED",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Event::QueryParsed
            | Event::QueryRewritten
            | Event::SourceDispatched
            | Event::SourceRestarted => Severity::Trace,
            Event::QueryDisabled | Event::QueryCompleted => Severity::Info,
            Event::RestartCapReached => Severity::Warn,
            Event::QueryFailed => Severity::Error,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
