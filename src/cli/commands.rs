//! CLI command implementations
//!
//! Each command builds its JSON payload; `run_command` writes it to stdout
//! inside the `{"status": "ok", "data": ...}` envelope.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{json, Value};

use crate::change::{change_rules, change_schema, visible_to, Change, ChangeQueryBuilder};
use crate::config::IndexConfig;
use crate::index::{Index, MemoryIndex};
use crate::observability::Logger;
use crate::processor::{QueryOptions, QueryProcessor};
use crate::query::QueryBuilder;
use crate::rewrite::{IndexRewriter, Rewriter};
use crate::schema::Schema;

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_changes, write_error, write_response};

/// Options of the `query` command
#[derive(Debug, Clone, Default)]
pub struct QueryRequest {
    pub changes: PathBuf,
    pub config: Option<PathBuf>,
    pub start: usize,
    pub limit: usize,
    pub permitted: Option<usize>,
    pub user: Option<String>,
    pub no_visibility: bool,
    pub queries: Vec<String>,
}

/// Main entry point for CLI
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    let result = match cmd {
        Command::Parse { query } => parse(&query),
        Command::Explain {
            config,
            limit,
            query,
        } => explain(config.as_deref(), limit, &query),
        Command::Query {
            changes,
            config,
            start,
            limit,
            permitted,
            user,
            no_visibility,
            queries,
        } => execute(&QueryRequest {
            changes,
            config,
            start,
            limit,
            permitted,
            user,
            no_visibility,
            queries,
        }),
    };
    match result {
        Ok(data) => write_response(data),
        Err(e) => {
            write_error(e.code_str(), e.message())?;
            Err(e)
        }
    }
}

/// Load configuration and apply its log level
fn load_config(path: Option<&Path>) -> CliResult<Arc<IndexConfig>> {
    let config = match path {
        Some(path) => IndexConfig::load(path)?,
        None => IndexConfig::default(),
    };
    Logger::set_min_severity(config.min_severity()?);
    Ok(Arc::new(config))
}

fn schema() -> CliResult<Arc<Schema<Change>>> {
    change_schema()
        .map(Arc::new)
        .map_err(|e| CliError::query_error(format!("{} ({})", e, e.code())))
}

fn open_index(changes: Vec<Change>, config: &IndexConfig) -> CliResult<Arc<MemoryIndex<Change>>> {
    let schema = change_schema().map_err(|e| CliError::query_error(e.to_string()))?;
    let index = MemoryIndex::new(schema, config.max_limit);
    index.insert_all(changes)?;
    Ok(Arc::new(index))
}

/// Compile a query and report its predicate
pub fn parse(query: &str) -> CliResult<Value> {
    let builder = ChangeQueryBuilder::new(schema()?);
    let pred = builder.parse(query)?;
    Ok(json!({
        "query": query,
        "predicate": pred.to_string(),
    }))
}

/// Report the compiled, rule-rewritten and source-composed forms of a query
pub fn explain(config: Option<&Path>, limit: usize, query: &str) -> CliResult<Value> {
    let config = load_config(config)?;
    let builder = ChangeQueryBuilder::new(schema()?);
    let compiled = builder.parse(query)?;
    let rewritten = change_rules(&builder)?.rewrite_tree(&compiled)?;

    let index: Arc<dyn Index<Change>> = open_index(Vec::new(), &config)?;
    let rewriter = IndexRewriter::new(index).with_rules(change_rules(&builder)?);
    let fetch = limit.max(1) + 1;
    let opts = QueryOptions::new(Arc::clone(&config), 0, fetch, fetch, BTreeSet::new())?;
    let sources = rewriter.rewrite(&compiled, &opts)?;

    Ok(json!({
        "query": query,
        "compiled": compiled.to_string(),
        "rewritten": rewritten.to_string(),
        "sources": sources.to_string(),
        "data_source": sources.is_data_source(),
    }))
}

/// Run queries against the changes in a file
pub fn execute(request: &QueryRequest) -> CliResult<Value> {
    let config = load_config(request.config.as_deref())?;
    let changes = read_changes(&request.changes)?;

    let mut builder = ChangeQueryBuilder::new(schema()?);
    if let Some(user) = &request.user {
        builder = builder.with_self_user(user.clone());
    }

    let memory = open_index(changes, &config)?;
    let index: Arc<dyn Index<Change>> = memory;
    let rewriter: Arc<dyn Rewriter<Change>> =
        Arc::new(IndexRewriter::new(Arc::clone(&index)).with_rules(change_rules(&builder)?));

    let mut processor = QueryProcessor::new(index, rewriter, Arc::clone(&config))
        .with_start(request.start)
        .with_user_limit(request.limit)
        .with_visibility(visible_to(request.user.as_deref().unwrap_or_default()))
        .enforce_visibility(!request.no_visibility);
    if let Some(permitted) = request.permitted {
        processor = processor.with_permitted_limit(permitted);
    }

    let queries: Vec<&str> = request.queries.iter().map(String::as_str).collect();
    let results = processor.query_strings(&builder, &queries)?;
    Ok(serde_json::to_value(&results)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_changes(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("changes.json");
        let changes = json!([
            {"id": 1, "key": "I1111aaaa", "project": "core", "branch": "main",
             "status": "new", "owner": "alice", "subject": "Add lexer",
             "created": "2024-01-01T00:00:00Z", "updated": "2024-01-05T00:00:00Z"},
            {"id": 2, "key": "I2222bbbb", "project": "core", "branch": "main",
             "status": "merged", "owner": "bob", "subject": "Fix docs",
             "created": "2024-01-02T00:00:00Z", "updated": "2024-01-06T00:00:00Z"},
            {"id": 3, "key": "I3333cccc", "project": "core", "branch": "main",
             "status": "new", "owner": "bob", "subject": "Secret work", "private": true,
             "created": "2024-01-03T00:00:00Z", "updated": "2024-01-07T00:00:00Z"}
        ]);
        fs::write(&path, changes.to_string()).unwrap();
        path
    }

    fn request(dir: &TempDir, queries: &[&str]) -> QueryRequest {
        QueryRequest {
            changes: write_changes(dir),
            queries: queries.iter().map(|q| q.to_string()).collect(),
            ..Default::default()
        }
    }

    fn ids(result: &Value) -> Vec<u64> {
        result["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["id"].as_u64().unwrap())
            .collect()
    }

    #[test]
    fn test_parse_command() {
        let out = parse("p:core -is:open").unwrap();
        assert_eq!(out["predicate"], "(project:core -status:new)");
    }

    #[test]
    fn test_parse_command_reports_query_error() {
        let err = parse("nope:x").unwrap_err();
        assert_eq!(err.code_str(), "QDX_CLI_QUERY_ERROR");
        assert!(err.message().contains("QDX_UNSUPPORTED_OPERATOR"));
    }

    #[test]
    fn test_explain_shows_each_stage() {
        let out = explain(None, 10, "project:core -status:merged").unwrap();
        assert_eq!(out["compiled"], "(project:core -status:merged)");
        assert_eq!(
            out["rewritten"],
            "(project:core (status:new OR status:abandoned))"
        );
        assert_eq!(out["data_source"], true);
    }

    #[test]
    fn test_query_hides_private_changes() {
        let dir = TempDir::new().unwrap();
        let out = execute(&request(&dir, &["project:core"])).unwrap();
        assert_eq!(ids(&out[0]), vec![1, 2]);
        assert_eq!(out[0]["query"], "project:core");
    }

    #[test]
    fn test_query_owner_sees_private_change() {
        let dir = TempDir::new().unwrap();
        let mut req = request(&dir, &["owner:self"]);
        req.user = Some("bob".into());
        let out = execute(&req).unwrap();
        assert_eq!(ids(&out[0]), vec![2, 3]);
    }

    #[test]
    fn test_query_limit_and_more() {
        let dir = TempDir::new().unwrap();
        let mut req = request(&dir, &["status:new OR status:merged"]);
        req.limit = 1;
        req.no_visibility = true;
        let out = execute(&req).unwrap();
        assert_eq!(ids(&out[0]), vec![1]);
        assert_eq!(out[0]["more"], true);
    }

    #[test]
    fn test_query_with_config_file() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("querydex.json");
        fs::write(&config, r#"{"max_limit": 3, "log_level": "error"}"#).unwrap();
        let mut req = request(&dir, &["branch:main"]);
        req.config = Some(config);
        req.no_visibility = true;
        let out = execute(&req).unwrap();
        // one slot of the backend maximum is reserved for detecting more results
        assert_eq!(ids(&out[0]), vec![1, 2]);
        assert_eq!(out[0]["more"], true);
    }

    #[test]
    fn test_query_rejects_bad_config() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("querydex.json");
        fs::write(&config, r#"{"page_size_multiplier": 0}"#).unwrap();
        let mut req = request(&dir, &["branch:main"]);
        req.config = Some(config);
        assert_eq!(execute(&req).unwrap_err().code_str(), "QDX_CLI_CONFIG_ERROR");
    }
}
