//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;

/// git-backup - Mirror the repositories of a hosting provider to local disk
#[derive(Parser, Debug)]
#[command(name = "git-backup")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    ///
    /// `RUST_LOG` takes precedence when it is set.
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create or update the backup described by a config file
    Create(commands::create::CreateArgs),

    /// Show what `create` would do without touching the disk
    Plan(commands::plan::PlanArgs),

    /// Check a config file without fetching anything
    Validate(commands::validate::ValidateArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    fn init_logging(&self) {
        let env = env_logger::Env::default().default_filter_or(self.log_level.as_str());
        // A logger may already be installed when embedded in tests
        let _ = env_logger::Builder::from_env(env)
            .format_timestamp(None)
            .format_target(false)
            .try_init();
    }

    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        self.init_logging();

        match self.command {
            Commands::Create(args) => commands::create::execute(args, &self.color),
            Commands::Plan(args) => commands::plan::execute(args, &self.color),
            Commands::Validate(args) => commands::validate::execute(args, &self.color),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}
