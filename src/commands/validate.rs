//! # Validate Command Implementation
//!
//! Loads the configuration file and runs every check `create` would run
//! before fetching anything: required keys, request URL syntax and the
//! backup directory. With `--check-listing` the listing is fetched as well
//! and must decode to a JSON array.
//!
//! This command never writes to disk.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use git_backup::listing;
use git_backup::output::{emoji, OutputConfig};

/// Validate a config file
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to the config file.
    #[arg(value_name = "CONFIG", env = "GIT_BACKUP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Also fetch the repository listing and check that it is a JSON array
    #[arg(long)]
    pub check_listing: bool,
}

/// Execute the `validate` command.
pub fn execute(args: ValidateArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let path = super::config_path(args.config)?;
    let config = super::load_config(Some(path.clone()))?;

    println!(
        "{} Configuration is valid: {}",
        emoji(&out, "✅", "[OK]"),
        path.display()
    );
    println!("   request_url: {}", config.request_url);
    println!("   backup_dir:  {}", config.backup_dir.display());
    println!(
        "   layout:      {}",
        if config.clone_bare { "bare (name.git)" } else { "mirror" }
    );
    println!("   jobs:        {}", config.jobs);
    match config.git_timeout {
        Some(timeout) => println!("   git_timeout: {}s", timeout.as_secs()),
        None => println!("   git_timeout: none"),
    }

    if args.check_listing {
        let entries = listing::fetch_listing(config.request_url.as_str())?;
        println!(
            "{} Listing returned {} repositories",
            emoji(&out, "✅", "[OK]"),
            entries.len()
        );
    }

    Ok(())
}
