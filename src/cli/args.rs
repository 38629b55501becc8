//! CLI argument definitions using clap
//!
//! Commands:
//! - querydex parse <query>
//! - querydex explain [--config <path>] [--limit N] <query>
//! - querydex query --changes <path> [--config <path>] [options] <query>...

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// querydex - typed queries over an indexed change collection
#[derive(Parser, Debug)]
#[command(name = "querydex")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile a query and print its predicate
    Parse {
        query: String,
    },

    /// Show how a query is compiled, rewritten and split into sources
    Explain {
        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Result limit used to size backend requests
        #[arg(long, default_value_t = 25)]
        limit: usize,

        query: String,
    },

    /// Run queries against a JSON file of changes
    Query {
        /// JSON array of changes
        #[arg(long)]
        changes: PathBuf,

        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Leading results to skip
        #[arg(long, default_value_t = 0)]
        start: usize,

        /// Requested number of results; 0 leaves it to the other limits
        #[arg(long, default_value_t = 0)]
        limit: usize,

        /// Largest result count the caller is allowed
        #[arg(long)]
        permitted: Option<usize>,

        /// Querying user; resolves `self` and private change visibility
        #[arg(long)]
        user: Option<String>,

        /// Return private changes regardless of owner
        #[arg(long)]
        no_visibility: bool,

        #[arg(required = true)]
        queries: Vec<String>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
