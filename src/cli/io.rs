//! JSON I/O handling for CLI
//!
//! - Input: a JSON array of changes read from a file
//! - Output: single JSON object via stdout
//! - UTF-8 only

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde_json::Value;

use super::errors::{CliError, CliResult};
use crate::change::Change;

/// Read every change from a JSON array file
pub fn read_changes(path: &Path) -> CliResult<Vec<Change>> {
    let content = fs::read_to_string(path)
        .map_err(|e| CliError::io_error(format!("Failed to read {}: {}", path.display(), e)))?;
    serde_json::from_str(&content)
        .map_err(|e| CliError::input_error(format!("Invalid changes in {}: {}", path.display(), e)))
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });

    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, &response)?;
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}

/// Write an error response to stdout
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    });

    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, &response)?;
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_changes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("changes.json");
        fs::write(
            &path,
            r#"[{"id": 1, "key": "I1111aaaa", "project": "core", "branch": "main",
                 "status": "merged", "owner": "alice", "subject": "One",
                 "created": "2024-01-01T00:00:00Z", "updated": "2024-01-01T00:00:00Z"}]"#,
        )
        .unwrap();
        let changes = read_changes(&path).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].project, "core");
    }

    #[test]
    fn test_rejects_malformed_changes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("changes.json");
        fs::write(&path, r#"[{"id": "one"}]"#).unwrap();
        assert_eq!(read_changes(&path).unwrap_err().code_str(), "QDX_CLI_INPUT_ERROR");
        assert_eq!(
            read_changes(&dir.path().join("missing.json")).unwrap_err().code_str(),
            "QDX_CLI_IO_ERROR"
        );
    }
}
