//! # git-backup CLI
//!
//! This is the binary entry point for the `git-backup` command-line tool.
//!
//! It parses the command line with `clap`, runs the selected command and lets
//! `anyhow` turn any error into a message and a non-zero exit code. The work
//! itself lives in the `git_backup` library crate.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
