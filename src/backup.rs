//! # Batch Orchestration
//!
//! This module drives a whole backup run: it walks the repository listing,
//! resolves every record, prepares its directory layout and syncs it, and
//! collects the per-repository outcomes into a [`BatchReport`].
//!
//! ## Failure Isolation
//!
//! Nothing scoped to a single repository stops the batch. A record without
//! an identifier, an unsafe path, a directory that cannot be created or a
//! failing git command are all recorded in the report and logged at warn
//! level, and the loop moves on.
//!
//! ## Execution
//!
//! Every record is resolved first, in listing order, without touching the
//! disk. What happens next depends on `jobs`:
//!
//! - With `jobs = 1` each record is laid out and synced before the next one
//!   is looked at, so the run is strictly sequential.
//! - Otherwise jobs run on a rayon thread pool with `jobs` workers. Jobs
//!   whose targets are equal or nested inside one another share a group and
//!   run one after the other in listing order, so two git processes never
//!   work in the same directory tree.
//!
//! In both modes a job's parent directories are created right before its
//! own sync. Outcomes are sorted back into listing order at the end.
//!
//! A cancellation flag can be shared with a signal handler. Once it is set no
//! new git command starts; syncs already running are allowed to finish and
//! the remaining repositories are reported as skipped.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};
use rayon::prelude::*;
use serde_json::Value;

use crate::config::BackupConfig;
use crate::error::{Error, Result};
use crate::git::{self, GitOperations, SyncAction, SyncOutcome, SystemGit};
use crate::layout;
use crate::record::{self, CloneEndpoint, RepositoryIdentifier};

/// What happened to one listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStatus {
    Cloned,
    Updated,
    Failed { reason: String },
    /// Not attempted because the run was cancelled.
    Skipped,
}

/// Report line for one listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReport {
    /// Position in the listing.
    pub index: usize,
    /// Resolved identifier, if resolution got that far.
    pub identifier: Option<String>,
    pub target: Option<PathBuf>,
    pub status: ItemStatus,
}

impl ItemReport {
    fn failed(index: usize, identifier: Option<String>, reason: impl Into<String>) -> Self {
        Self {
            index,
            identifier,
            target: None,
            status: ItemStatus::Failed {
                reason: reason.into(),
            },
        }
    }

    /// Identifier for display, falling back to the listing position.
    pub fn label(&self) -> String {
        self.identifier
            .clone()
            .unwrap_or_else(|| format!("<record #{}>", self.index))
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, ItemStatus::Cloned | ItemStatus::Updated)
    }
}

/// Aggregated outcome of a run, in listing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub items: Vec<ItemReport>,
}

impl BatchReport {
    fn count(&self, pred: impl Fn(&ItemStatus) -> bool) -> usize {
        self.items.iter().filter(|item| pred(&item.status)).count()
    }

    pub fn total(&self) -> usize {
        self.items.len()
    }

    pub fn cloned(&self) -> usize {
        self.count(|s| matches!(s, ItemStatus::Cloned))
    }

    pub fn updated(&self) -> usize {
        self.count(|s| matches!(s, ItemStatus::Updated))
    }

    pub fn succeeded(&self) -> usize {
        self.cloned() + self.updated()
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, ItemStatus::Failed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, ItemStatus::Skipped))
    }

    /// Failed items, in listing order.
    pub fn failures(&self) -> impl Iterator<Item = &ItemReport> {
        self.items
            .iter()
            .filter(|item| matches!(item.status, ItemStatus::Failed { .. }))
    }

    /// True when nothing failed and nothing was skipped.
    pub fn is_success(&self) -> bool {
        self.failed() == 0 && self.skipped() == 0
    }
}

/// A record that resolved to a target under the backup directory.
///
/// Nothing has been created on disk yet.
#[derive(Debug, Clone)]
struct Job {
    index: usize,
    identifier: RepositoryIdentifier,
    endpoint: CloneEndpoint,
    target: PathBuf,
}

type Observer<'a> = Box<dyn Fn(&ItemReport) + Send + Sync + 'a>;

/// Runs a backup batch against one configuration.
pub struct BatchRunner<'a> {
    config: &'a BackupConfig,
    git: &'a dyn GitOperations,
    cancel: Option<Arc<AtomicBool>>,
    observer: Option<Observer<'a>>,
}

impl<'a> BatchRunner<'a> {
    pub fn new(config: &'a BackupConfig, git: &'a dyn GitOperations) -> Self {
        Self {
            config,
            git,
            cancel: None,
            observer: None,
        }
    }

    /// Stop starting new syncs once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Call `observer` as each item finishes, from whichever worker ran it.
    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(&ItemReport) + Send + Sync + 'a,
    {
        self.observer = Some(Box::new(observer));
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    fn notify(&self, item: &ItemReport) {
        if let Some(observer) = &self.observer {
            observer(item);
        }
    }

    fn record_failure(&self, item: ItemReport) -> ItemReport {
        warn!("Skipping {}: {}", item.label(), failure_reason(&item));
        self.notify(&item);
        item
    }

    /// Resolve one listing entry. Touches nothing on disk.
    fn resolve(&self, index: usize, entry: &Value) -> std::result::Result<Job, ItemReport> {
        let fail = |identifier: Option<String>, e: Error| {
            ItemReport::failed(index, identifier, e.to_string())
        };

        let record = record::as_record(entry).map_err(|e| fail(None, e))?;
        let identifier = record::resolve_identifier(record).map_err(|e| fail(None, e))?;
        let endpoint = record::resolve_endpoint(record)
            .map_err(|e| fail(Some(identifier.to_string()), e))?;
        let target =
            layout::target_path(&identifier, &self.config.backup_dir, self.config.clone_bare);

        Ok(Job {
            index,
            identifier,
            endpoint,
            target,
        })
    }

    /// Lay out and sync one job.
    ///
    /// Parent directories are created here, immediately before the sync, so
    /// they cannot make an earlier job's target look present.
    fn process(&self, job: &Job) -> ItemReport {
        if self.cancelled() {
            debug!("Skipping {} (cancelled)", job.identifier);
            let item = ItemReport {
                index: job.index,
                identifier: Some(job.identifier.to_string()),
                target: Some(job.target.clone()),
                status: ItemStatus::Skipped,
            };
            self.notify(&item);
            return item;
        }

        let planned = layout::plan(
            &job.identifier,
            &self.config.backup_dir,
            self.config.clone_bare,
        );
        if let Err(e) = planned {
            let item =
                ItemReport::failed(job.index, Some(job.identifier.to_string()), e.to_string());
            return self.record_failure(item);
        }

        debug!("Backing up {}", job.identifier);
        let status = match git::sync(
            self.git,
            &job.endpoint,
            &job.target,
            self.config.clone_bare,
        ) {
            SyncOutcome::Success { action } if action.is_clone() => ItemStatus::Cloned,
            SyncOutcome::Success { .. } => ItemStatus::Updated,
            SyncOutcome::Failure { action, stderr } => {
                warn!("The command \"{}\" failed.", action);
                warn!("{}", stderr);
                ItemStatus::Failed { reason: stderr }
            }
        };

        let item = ItemReport {
            index: job.index,
            identifier: Some(job.identifier.to_string()),
            target: Some(job.target.clone()),
            status,
        };
        self.notify(&item);
        item
    }

    /// Process every entry of `entries` and report the outcome.
    ///
    /// Only a worker pool that cannot be built makes this fail; everything
    /// scoped to a repository ends up in the report.
    pub fn run(&self, entries: &[Value]) -> Result<BatchReport> {
        let sequential = self.config.jobs <= 1;
        let mut items = Vec::with_capacity(entries.len());
        let mut jobs = Vec::new();

        for (index, entry) in entries.iter().enumerate() {
            match self.resolve(index, entry) {
                Ok(job) if sequential => items.push(self.process(&job)),
                Ok(job) => jobs.push(job),
                Err(item) => items.push(self.record_failure(item)),
            }
        }

        if !jobs.is_empty() {
            let groups = group_overlapping(jobs, &self.config.backup_dir);
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.jobs)
                .build()
                .map_err(|e| Error::WorkerPool {
                    message: e.to_string(),
                })?;
            let synced: Vec<ItemReport> = pool.install(|| {
                groups
                    .par_iter()
                    .flat_map_iter(|group| group.iter().map(|job| self.process(job)))
                    .collect()
            });
            items.extend(synced);
        }

        items.sort_by_key(|item| item.index);

        let report = BatchReport { items };
        info!(
            "Backup finished: {} cloned, {} updated, {} failed, {} skipped",
            report.cloned(),
            report.updated(),
            report.failed(),
            report.skipped()
        );
        Ok(report)
    }
}

/// Split jobs into groups that can run concurrently.
///
/// Two jobs land in the same group when their targets are equal or one lies
/// inside the other. Groups keep first-seen order and jobs keep listing
/// order inside a group, so each group replays exactly what a sequential run
/// would do for those targets.
fn group_overlapping(jobs: Vec<Job>, backup_root: &Path) -> Vec<Vec<Job>> {
    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    let mut parent: Vec<usize> = (0..jobs.len()).collect();
    {
        // target -> first job with that target
        let mut targets: HashMap<&Path, usize> = HashMap::new();
        // directory -> jobs whose target lies strictly inside it
        let mut containing: HashMap<&Path, Vec<usize>> = HashMap::new();

        for (i, job) in jobs.iter().enumerate() {
            let target = job.target.as_path();
            let ancestors: Vec<&Path> = target
                .ancestors()
                .skip(1)
                .take_while(|dir| *dir != backup_root && dir.starts_with(backup_root))
                .collect();

            let mut related: Vec<usize> = Vec::new();
            related.extend(targets.get(target).copied());
            related.extend(containing.get(target).into_iter().flatten().copied());
            related.extend(ancestors.iter().filter_map(|dir| targets.get(dir).copied()));

            for j in related {
                let (a, b) = (find(&mut parent, i), find(&mut parent, j));
                if a != b {
                    parent[a.max(b)] = a.min(b);
                }
            }

            targets.entry(target).or_insert(i);
            for dir in ancestors {
                containing.entry(dir).or_default().push(i);
            }
        }
    }

    let roots: Vec<usize> = (0..jobs.len()).map(|i| find(&mut parent, i)).collect();
    let mut groups: Vec<Vec<Job>> = Vec::new();
    let mut group_of: HashMap<usize, usize> = HashMap::new();
    for (job, root) in jobs.into_iter().zip(roots) {
        match group_of.get(&root) {
            Some(&group) => groups[group].push(job),
            None => {
                group_of.insert(root, groups.len());
                groups.push(vec![job]);
            }
        }
    }
    groups
}

/// What a run would do with one listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedItem {
    pub index: usize,
    pub identifier: Option<String>,
    /// The git action, or why the entry would fail before reaching git.
    pub action: std::result::Result<SyncAction, String>,
}

/// Work out the action for every entry without creating directories or
/// running git.
pub fn preview(entries: &[Value], config: &BackupConfig) -> Vec<PlannedItem> {
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let resolved = record::as_record(entry).and_then(record::resolve);
            match resolved {
                Ok(repo) => {
                    let target = layout::target_path(
                        &repo.identifier,
                        &config.backup_dir,
                        config.clone_bare,
                    );
                    PlannedItem {
                        index,
                        identifier: Some(repo.identifier.to_string()),
                        action: Ok(SyncAction::decide(
                            &repo.endpoint,
                            &target,
                            config.clone_bare,
                        )),
                    }
                }
                Err(e) => PlannedItem {
                    index,
                    identifier: entry
                        .as_object()
                        .and_then(|r| record::resolve_identifier(r).ok())
                        .map(|id| id.to_string()),
                    action: Err(e.to_string()),
                },
            }
        })
        .collect()
}

fn failure_reason(item: &ItemReport) -> &str {
    match &item.status {
        ItemStatus::Failed { reason } => reason,
        _ => "",
    }
}

/// Back up every repository in `entries` sequentially with the git
/// executable named in `config`.
pub fn run(entries: &[Value], config: &BackupConfig) -> Result<BatchReport> {
    let git = SystemGit::new(config.git_program.clone()).with_timeout(config.git_timeout);
    let report = BatchRunner::new(config, &git).run(entries);
    report
}
