//! Metrics registry
//!
//! - Counters only
//! - Monotonic increase
//! - Reset only on process start

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use serde::Serialize;

/// Operational counters of the query engine
///
/// Counters use Relaxed ordering; exact totals are only needed once
/// the counted work has finished.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    queries_executed: AtomicU64,
    queries_disabled: AtomicU64,
    queries_failed: AtomicU64,
    queries_truncated: AtomicU64,
    results_returned: AtomicU64,
    source_restarts: AtomicU64,
    entities_filtered: AtomicU64,
}

static GLOBAL: OnceLock<MetricsRegistry> = OnceLock::new();

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry
    pub fn global() -> &'static MetricsRegistry {
        GLOBAL.get_or_init(MetricsRegistry::new)
    }

    pub fn increment_queries_executed(&self) {
        self.queries_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_queries_disabled(&self) {
        self.queries_disabled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_queries_failed(&self) {
        self.queries_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// A result was cut to its limit with more available
    pub fn increment_queries_truncated(&self) {
        self.queries_truncated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_results_returned(&self, count: u64) {
        self.results_returned.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_source_restarts(&self) {
        self.source_restarts.fetch_add(1, Ordering::Relaxed);
    }

    /// Entities dropped by in-memory filtering
    pub fn add_entities_filtered(&self, count: u64) {
        self.entities_filtered.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queries_executed: self.queries_executed.load(Ordering::Relaxed),
            queries_disabled: self.queries_disabled.load(Ordering::Relaxed),
            queries_failed: self.queries_failed.load(Ordering::Relaxed),
            queries_truncated: self.queries_truncated.load(Ordering::Relaxed),
            results_returned: self.results_returned.load(Ordering::Relaxed),
            source_restarts: self.source_restarts.load(Ordering::Relaxed),
            entities_filtered: self.entities_filtered.load(Ordering::Relaxed),
        }
    }

    /// Current counters as one JSON object
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}

/// A point-in-time copy of all counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub queries_executed: u64,
    pub queries_disabled: u64,
    pub queries_failed: u64,
    pub queries_truncated: u64,
    pub results_returned: u64,
    pub source_restarts: u64,
    pub entities_filtered: u64,
}
