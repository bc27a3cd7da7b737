//! # git-backup
//!
//! This library mirrors the repositories listed by a hosting provider's API
//! (GitHub, GitLab, Gitea and friends) to local disk. Each repository is kept
//! as a `git clone --mirror` under a backup directory and refreshed with
//! `git fetch --all` on later runs. It powers the `git-backup` command-line
//! tool but can be embedded elsewhere.
//!
//! ## Quick Example
//!
//! ```
//! use git_backup::layout;
//! use git_backup::record::{self, RepositoryRecord};
//! use std::path::Path;
//!
//! let entry: RepositoryRecord = serde_json::from_str(
//!     r#"{"path_with_namespace": "team/app", "clone_url": "https://host/team/app.git"}"#,
//! )
//! .unwrap();
//!
//! let repo = record::resolve(&entry).unwrap();
//! assert_eq!(repo.identifier.as_str(), "team/app");
//!
//! let target = layout::target_path(&repo.identifier, Path::new("/srv/backup"), false);
//! assert_eq!(target, Path::new("/srv/backup/team/app"));
//! ```
//!
//! ## Core Concepts
//!
//! - **Configuration (`config`)**: Loads and validates the backup
//!   configuration file into an immutable `BackupConfig`.
//! - **Listing (`listing`)**: Fetches the JSON array of repositories with a
//!   single HTTP GET.
//! - **Records (`record`)**: Resolves a loosely typed listing entry into a
//!   validated identifier and a clone endpoint.
//! - **Layout (`layout`)**: Maps identifiers onto the backup directory and
//!   creates intermediate directories.
//! - **Git (`git`)**: Decides between clone and update and runs git.
//! - **Backup (`backup`)**: Runs the whole batch, isolating per-repository
//!   failures, and produces a `BatchReport`.
//!
//! ## Execution Flow
//!
//! 1.  Load the configuration.
//! 2.  Fetch and decode the repository listing.
//! 3.  For every entry: resolve, plan the layout, then clone or update.
//! 4.  Report what was cloned, updated, failed or skipped.

pub mod backup;
pub mod config;
pub mod error;
pub mod git;
pub mod layout;
pub mod listing;
pub mod output;
pub mod record;

#[cfg(test)]
mod record_proptest;
