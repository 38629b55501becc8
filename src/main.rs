//! querydex CLI entry point
//!
//! Parses arguments and dispatches through `cli::run`; errors are printed to
//! stderr and end the process with a non-zero status.

use querydex::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
