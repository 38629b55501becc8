//! Engine configuration
//!
//! `IndexConfig` holds the limits and pagination settings shared by every
//! query run against one index. It is read from a JSON file; every field is
//! optional and falls back to its default.

mod errors;

pub use errors::{ConfigError, ConfigResult};

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::observability::Severity;

/// How a paginated source continues after a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationType {
    /// Restart from a numeric offset
    #[default]
    Offset,
    /// Restart after the cursor returned with the previous page
    SearchAfter,
}

/// Limits and pagination settings for one index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Hard maximum number of results the backend returns per request
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,

    /// Largest page size a restarting source may grow to
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,

    /// Page size growth factor applied on every restart (>= 1)
    #[serde(default = "default_page_size_multiplier")]
    pub page_size_multiplier: usize,

    /// First page size; 0 requests the whole limit in one page
    #[serde(default)]
    pub initial_page_size: usize,

    /// Maximum number of index terms in one query
    #[serde(default = "default_max_terms")]
    pub max_terms: usize,

    /// Maximum page number reachable through `start`; 0 is unlimited
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    #[serde(default)]
    pub pagination_type: PaginationType,

    /// Maximum restarts of one source to compensate for filtering; 0 is unlimited
    #[serde(default = "default_max_restarts")]
    pub max_restarts: usize,

    /// Minimum log severity: trace, info, warn or error
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_max_limit() -> usize {
    10_000
}

fn default_max_page_size() -> usize {
    10_000
}

fn default_page_size_multiplier() -> usize {
    1
}

fn default_max_terms() -> usize {
    1024
}

fn default_max_pages() -> usize {
    100
}

fn default_max_restarts() -> usize {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_limit: default_max_limit(),
            max_page_size: default_max_page_size(),
            page_size_multiplier: default_page_size_multiplier(),
            initial_page_size: 0,
            max_terms: default_max_terms(),
            max_pages: default_max_pages(),
            pagination_type: PaginationType::Offset,
            max_restarts: default_max_restarts(),
            log_level: default_log_level(),
        }
    }
}

impl IndexConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(&content)
    }

    /// Parse and validate configuration JSON
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: IndexConfig =
            serde_json::from_str(content).map_err(|e| ConfigError::InvalidJson(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_limit < 2 {
            return Err(ConfigError::invalid("max_limit", "must be >= 2"));
        }
        if self.max_page_size == 0 {
            return Err(ConfigError::invalid("max_page_size", "must be > 0"));
        }
        if self.page_size_multiplier == 0 {
            return Err(ConfigError::invalid("page_size_multiplier", "must be >= 1"));
        }
        if self.max_terms == 0 {
            return Err(ConfigError::invalid("max_terms", "must be > 0"));
        }
        self.min_severity()?;
        Ok(())
    }

    /// Minimum severity named by `log_level`
    pub fn min_severity(&self) -> ConfigResult<Severity> {
        Severity::parse(&self.log_level)
            .ok_or_else(|| ConfigError::invalid("log_level", format!("unknown level '{}'", self.log_level)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = IndexConfig::from_json("{}").unwrap();
        assert_eq!(config, IndexConfig::default());
        assert_eq!(config.max_limit, 10_000);
        assert_eq!(config.max_restarts, 1000);
        assert_eq!(config.pagination_type, PaginationType::Offset);
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("querydex.json");
        let content = json!({
            "max_limit": 500,
            "pagination_type": "search_after",
            "log_level": "warn"
        });
        fs::write(&path, content.to_string()).unwrap();

        let config = IndexConfig::load(&path).unwrap();
        assert_eq!(config.max_limit, 500);
        assert_eq!(config.pagination_type, PaginationType::SearchAfter);
        assert_eq!(config.min_severity().unwrap(), Severity::Warn);
    }

    #[test]
    fn test_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = IndexConfig::load(&temp_dir.path().join("absent.json")).unwrap_err();
        assert_eq!(err.code(), "QDX_CONFIG_READ");
    }

    #[test]
    fn test_rejects_zero_multiplier() {
        let err = IndexConfig::from_json(r#"{"page_size_multiplier": 0}"#).unwrap_err();
        assert_eq!(err, ConfigError::invalid("page_size_multiplier", "must be >= 1"));
    }

    #[test]
    fn test_rejects_unknown_log_level() {
        assert!(IndexConfig::from_json(r#"{"log_level": "loud"}"#).is_err());
        assert!(IndexConfig::from_json(r#"{"log_level": "fatal"}"#).is_err());
    }

    #[test]
    fn test_documented_log_levels() {
        for level in ["trace", "info", "warn", "error"] {
            let config = IndexConfig::from_json(&json!({ "log_level": level }).to_string()).unwrap();
            assert_eq!(config.min_severity().unwrap().as_str(), level.to_uppercase());
        }
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = IndexConfig::from_json("{not json").unwrap_err();
        assert_eq!(err.code(), "QDX_CONFIG_INVALID_JSON");
    }
}
