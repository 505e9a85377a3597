//! # Gold Deploy CLI
//!
//! This is the binary entry point for the `gold-deploy` command-line
//! tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Resolving unit selectors against the production catalog.
//! - Handling top-level application errors and translating them into a
//!   non-zero exit code.
//!
//! The orchestration logic is defined in the `lib.rs` library crate,
//! ensuring that the binary is a thin wrapper around the reusable
//! library functionality. Exit-code mapping happens here and only here;
//! the library communicates outcomes via error values.

mod cli;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
