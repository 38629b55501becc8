//! QueryScope for completion or failure logging of one query
//!
//! - Logs QUERY_COMPLETE when `complete()` is called
//! - Logs QUERY_FAILED when `fail()` is called or the scope is dropped
//!   without either

use std::cell::Cell;
use std::time::Instant;

use super::events::Event;
use super::log_event;
use super::metrics::MetricsRegistry;

/// Tracks one query from dispatch to materialization
pub struct QueryScope {
    query: String,
    timer: Timer,
    finished: Cell<bool>,
}

impl QueryScope {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            timer: Timer::new(),
            finished: Cell::new(false),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Record a successful query returning `count` results
    pub fn complete(self, count: usize, more: bool) {
        self.finished.set(true);
        let count = count.to_string();
        let elapsed = self.timer.elapsed_ms();
        log_event(
            Event::QueryCompleted,
            &[
                ("query", self.query.as_str()),
                ("results", count.as_str()),
                ("more", if more { "true" } else { "false" }),
                ("elapsed_ms", elapsed.as_str()),
            ],
        );
    }

    /// Record a failed query
    pub fn fail(self, code: &str, reason: &str) {
        self.finished.set(true);
        Self::log_failure(&self.query, code, reason);
    }

    fn log_failure(query: &str, code: &str, reason: &str) {
        MetricsRegistry::global().increment_queries_failed();
        log_event(
            Event::QueryFailed,
            &[("query", query), ("code", code), ("reason", reason)],
        );
    }

    pub fn is_finished(&self) -> bool {
        self.finished.get()
    }
}

impl Drop for QueryScope {
    fn drop(&mut self) {
        if !self.finished.get() {
            Self::log_failure(&self.query, "QDX_INCOMPLETE", "scope dropped without completion");
        }
    }
}

/// A simple duration timer for logging elapsed time
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Elapsed milliseconds as a string
    pub fn elapsed_ms(&self) -> String {
        self.start.elapsed().as_millis().to_string()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
