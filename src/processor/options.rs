//! Pagination options passed from the processor down to index reads

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::config::IndexConfig;
use crate::error::{EngineError, EngineResult};
use crate::source::SearchAfter;

/// Start offset, page size, limit and requested fields of one query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    config: Arc<IndexConfig>,
    start: usize,
    search_after: Option<SearchAfter>,
    page_size: usize,
    limit: usize,
    fields: BTreeSet<String>,
}

impl QueryOptions {
    /// Create options; `limit` and `page_size` must be positive
    pub fn new(
        config: Arc<IndexConfig>,
        start: usize,
        page_size: usize,
        limit: usize,
        fields: BTreeSet<String>,
    ) -> EngineResult<Self> {
        if limit == 0 {
            return Err(EngineError::InvalidOptions("limit must be > 0".to_string()));
        }
        if page_size == 0 {
            return Err(EngineError::InvalidOptions("page size must be > 0".to_string()));
        }
        Ok(Self {
            config,
            start,
            search_after: None,
            page_size,
            limit,
            fields,
        })
    }

    pub fn config(&self) -> &Arc<IndexConfig> {
        &self.config
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn search_after(&self) -> Option<&SearchAfter> {
        self.search_after.as_ref()
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_size_multiplier(&self) -> usize {
        self.config.page_size_multiplier
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn fields(&self) -> &BTreeSet<String> {
        &self.fields
    }

    pub fn with_start(&self, start: usize) -> Self {
        Self {
            start,
            ..self.clone()
        }
    }

    pub fn with_page_size(&self, page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            ..self.clone()
        }
    }

    pub fn with_search_after(&self, cursor: SearchAfter) -> Self {
        Self {
            search_after: Some(cursor),
            ..self.clone()
        }
    }

    /// Options for the index backend
    ///
    /// The backend always reads from offset 0 and returns `start + limit`
    /// entities; the outermost source skips `start` itself.
    pub fn convert_for_backend(&self) -> Self {
        Self {
            start: 0,
            page_size: self.start.saturating_add(self.page_size),
            limit: self.start.saturating_add(self.limit),
            ..self.clone()
        }
    }

    /// Page size for the next restart of a paginated source
    ///
    /// Grows by the configured multiplier, capped by the maximum page size
    /// and the backend's maximum limit.
    pub fn next_page_size(&self, current: usize) -> usize {
        current
            .saturating_mul(self.page_size_multiplier())
            .min(self.config.max_page_size)
            .min(self.config.max_limit)
            .max(1)
    }
}
