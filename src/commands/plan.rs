//! # Plan Command Implementation
//!
//! Fetches the repository listing and prints, for every entry, the
//! identifier, the target directory and whether `create` would clone or
//! update it. Entries that would fail before reaching git are shown with the
//! reason. Nothing is written to disk and git is never run.

use anyhow::Result;
use clap::Args;
use serde_json::json;
use std::path::PathBuf;

use git_backup::backup::{self, PlannedItem};
use git_backup::listing;
use git_backup::output::{paint, OutputConfig, Tone};

/// Show what `create` would do
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Path to the config file.
    #[arg(value_name = "CONFIG", env = "GIT_BACKUP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute the `plan` command.
pub fn execute(args: PlanArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let config = super::load_config(args.config)?;
    let entries = listing::fetch_listing(config.request_url.as_str())?;
    let planned = backup::preview(&entries, &config);

    if args.json {
        let items: Vec<_> = planned.iter().map(to_json).collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if planned.is_empty() {
        println!("The repository listing is empty.");
        return Ok(());
    }

    for item in &planned {
        let label = item
            .identifier
            .clone()
            .unwrap_or_else(|| format!("<record #{}>", item.index));
        match &item.action {
            Ok(action) => println!(
                "{:<7} {} -> {}",
                paint(&out, action.verb(), Tone::Good),
                label,
                action.target().display()
            ),
            Err(reason) => println!("{:<7} {}: {}", paint(&out, "error", Tone::Bad), label, reason),
        }
    }

    let errors = planned.iter().filter(|item| item.action.is_err()).count();
    println!(
        "\n{} repositories, {} would fail before reaching git",
        planned.len(),
        errors
    );
    Ok(())
}

fn to_json(item: &PlannedItem) -> serde_json::Value {
    match &item.action {
        Ok(action) => json!({
            "index": item.index,
            "identifier": item.identifier,
            "action": action.verb(),
            "target": action.target().display().to_string(),
            "command": action.to_string(),
        }),
        Err(reason) => json!({
            "index": item.index,
            "identifier": item.identifier,
            "action": "error",
            "error": reason,
        }),
    }
}
