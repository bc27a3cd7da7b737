//! # Create Command Implementation
//!
//! Runs a backup: loads the configuration, fetches the repository listing,
//! then clones new repositories and updates existing mirrors.
//!
//! - **Progress**: a progress bar is drawn on stderr when it is a terminal.
//! - **Interruption**: the first Ctrl-C stops new git commands from starting;
//!   running ones finish (git runs in its own process group, so the signal
//!   does not reach it) and the rest are reported as skipped. A second
//!   Ctrl-C exits at once and leaves running git commands behind.
//! - **Exit status**: non-zero when any repository failed or was skipped.

use anyhow::{bail, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use log::warn;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use git_backup::backup::{BatchReport, BatchRunner, ItemStatus};
use git_backup::git::SystemGit;
use git_backup::listing;
use git_backup::output::{emoji, paint, OutputConfig, Tone};

/// Create or update a backup
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Path to the config file.
    ///
    /// Defaults to `git-backup/config.toml` in the user's config directory.
    #[arg(value_name = "CONFIG", env = "GIT_BACKUP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Number of repositories to sync at the same time (overrides `jobs`)
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Kill git commands running longer than SECS, 0 to disable (overrides `git_timeout`)
    #[arg(long, value_name = "SECS")]
    pub git_timeout: Option<u64>,

    /// Suppress the progress bar and summary, only report errors
    #[arg(short, long)]
    pub quiet: bool,
}

/// Execute the `create` command.
pub fn execute(args: CreateArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let config = super::load_config(args.config)?.with_overrides(args.jobs, args.git_timeout)?;

    let entries = listing::fetch_listing(config.request_url.as_str())?;

    let git = SystemGit::new(config.git_program.clone()).with_timeout(config.git_timeout);

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        if let Err(e) = ctrlc::set_handler(move || {
            if cancel.swap(true, Ordering::SeqCst) {
                std::process::exit(130);
            }
            eprintln!("Interrupted: finishing running git commands, press Ctrl-C again to abort");
        }) {
            warn!("Could not install the Ctrl-C handler: {}", e);
        }
    }

    let progress = if args.quiet {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(entries.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {wide_msg}")?
                .progress_chars("=> "),
        );
        bar
    };

    let report = BatchRunner::new(&config, &git)
        .with_cancel_flag(Arc::clone(&cancel))
        .with_observer(|item| {
            progress.set_message(item.label());
            progress.inc(1);
        })
        .run(&entries)?;
    progress.finish_and_clear();

    if !args.quiet {
        print_summary(&out, &report);
    }

    if cancel.load(Ordering::SeqCst) {
        bail!(
            "Interrupted: {} of {} repositories were not synced",
            report.skipped(),
            report.total()
        );
    }
    if report.failed() > 0 {
        bail!(
            "{} of {} repositories could not be backed up",
            report.failed(),
            report.total()
        );
    }
    Ok(())
}

fn print_summary(out: &OutputConfig, report: &BatchReport) {
    for item in report.failures() {
        if let ItemStatus::Failed { reason } = &item.status {
            let first_line = reason.lines().next().unwrap_or_default();
            println!(
                "{} {} {}",
                emoji(out, "❌", "[FAIL]"),
                paint(out, &item.label(), Tone::Bad),
                first_line
            );
        }
    }

    let marker = if report.is_success() {
        emoji(out, "✅", "[OK]")
    } else {
        emoji(out, "⚠️ ", "[WARN]")
    };
    println!(
        "{} {} repositories: {} cloned, {} updated, {}, {}",
        marker,
        report.total(),
        paint(out, &report.cloned().to_string(), Tone::Good),
        paint(out, &report.updated().to_string(), Tone::Good),
        paint(out, &format!("{} failed", report.failed()), failure_tone(report.failed())),
        paint(out, &format!("{} skipped", report.skipped()), Tone::Muted),
    );
}

fn failure_tone(failed: usize) -> Tone {
    if failed > 0 {
        Tone::Bad
    } else {
        Tone::Muted
    }
}
