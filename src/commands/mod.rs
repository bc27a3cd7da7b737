//! # CLI Command Implementations
//!
//! Each subcommand of `git-backup` lives in its own file with an `Args`
//! struct derived with `clap` and an `execute` function that calls into the
//! `git_backup` library.

pub mod completions;
pub mod create;
pub mod plan;
pub mod validate;

use anyhow::{Context, Result};
use std::path::PathBuf;

use git_backup::config::{self, BackupConfig};

/// Pick the config file: the explicit argument, else the user's default.
pub fn config_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    explicit.or_else(config::default_config_path).context(
        "No config file given and no user config directory is available; pass CONFIG explicitly",
    )
}

/// Load and validate the configuration for a command.
pub fn load_config(explicit: Option<PathBuf>) -> Result<BackupConfig> {
    let path = config_path(explicit)?;
    BackupConfig::from_file(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}
