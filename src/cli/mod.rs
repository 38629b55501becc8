//! CLI module for querydex
//!
//! Provides command-line interface for:
//! - parse: compile a query and print its predicate
//! - explain: show the rewrite and source composition of a query
//! - query: run queries over a JSON file of changes

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{execute, explain, parse, run, run_command, QueryRequest};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_changes, write_error, write_response};
