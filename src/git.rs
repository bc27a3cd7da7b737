//! # Git Invocation and Sync Decisions
//!
//! Everything that talks to the `git` executable lives here. Commands are
//! always passed as an argument vector, never as a shell string, so nothing
//! in a repository record can be interpreted by a shell.
//!
//! The [`GitOperations`] trait is the seam between the sync logic and the
//! process: [`SystemGit`] runs the real executable, tests substitute a mock
//! that records the calls.

use std::ffi::OsString;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use log::debug;

use crate::error::{Error, Result};
use crate::record::CloneEndpoint;

/// How often a running git process is polled when a timeout is set.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Result of running one git command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub success: bool,
    /// Exit code, `None` when the process was killed by a signal or timed out.
    pub code: Option<i32>,
    pub stderr: String,
}

#[cfg(test)]
impl Invocation {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            code: Some(0),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stderr: stderr.into(),
        }
    }
}

/// Capability to run git - allows mocking in tests
pub trait GitOperations: Send + Sync {
    /// Run git with `args`, optionally inside `working_dir`.
    ///
    /// A non-zero exit is not an error: it is reported through
    /// [`Invocation::success`]. `Err` means the process could not be run at
    /// all.
    fn invoke(&self, args: &[OsString], working_dir: Option<&Path>) -> Result<Invocation>;
}

/// Runs the git executable found on `PATH` (or a configured program).
///
/// This uses the system git command, which automatically handles:
/// - SSH keys from ~/.ssh/
/// - Git credential helpers
/// - Any authentication configured in ~/.gitconfig
#[derive(Debug, Clone)]
pub struct SystemGit {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl Default for SystemGit {
    fn default() -> Self {
        Self::new("git")
    }
}

impl SystemGit {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
        }
    }

    /// Kill git commands that run longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn spawn_error(&self, source: std::io::Error) -> Error {
        Error::GitSpawn {
            program: self.program.display().to_string(),
            source,
        }
    }

    fn wait_with_timeout(&self, mut command: Command, timeout: Duration) -> Result<Invocation> {
        let mut child = command.spawn().map_err(|e| self.spawn_error(e))?;

        // stderr is drained on its own thread so a chatty git cannot fill the
        // pipe and stall while we poll.
        let (tx, rx) = mpsc::channel();
        if let Some(mut pipe) = child.stderr.take() {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = pipe.read_to_end(&mut buf);
                let _ = tx.send(buf);
            });
        }

        let deadline = Instant::now() + timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break Some(status);
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                break None;
            }
            thread::sleep(POLL_INTERVAL);
        };

        // Helpers such as ssh may outlive a killed git and keep the pipe open.
        let stderr = rx
            .recv_timeout(Duration::from_secs(1))
            .map(|buf| String::from_utf8_lossy(&buf).into_owned())
            .unwrap_or_default();

        Ok(match status {
            Some(status) => Invocation {
                success: status.success(),
                code: status.code(),
                stderr,
            },
            None => {
                let mut stderr = stderr.trim_end().to_string();
                if !stderr.is_empty() {
                    stderr.push('\n');
                }
                stderr.push_str(&format!(
                    "git timed out after {:?} and was killed",
                    timeout
                ));
                Invocation {
                    success: false,
                    code: None,
                    stderr,
                }
            }
        })
    }
}

impl GitOperations for SystemGit {
    fn invoke(&self, args: &[OsString], working_dir: Option<&Path>) -> Result<Invocation> {
        let mut command = Command::new(&self.program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            // Fail instead of waiting for a password nobody will type
            .env("GIT_TERMINAL_PROMPT", "0");
        if let Some(dir) = working_dir {
            command.current_dir(dir);
        }
        // Own process group: the terminal's Ctrl-C must not reach git.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        match self.timeout {
            Some(timeout) => self.wait_with_timeout(command, timeout),
            None => {
                let output = command.output().map_err(|e| self.spawn_error(e))?;
                Ok(Invocation {
                    success: output.status.success(),
                    code: output.status.code(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                })
            }
        }
    }
}

/// What to do for one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// Target is absent: mirror clone into it.
    Clone {
        endpoint: CloneEndpoint,
        target: PathBuf,
        bare: bool,
    },
    /// Target exists: fetch all remotes inside it.
    Update { target: PathBuf },
}

impl SyncAction {
    /// Pick clone or update based solely on whether `target` is a directory.
    ///
    /// A directory left behind by an interrupted clone counts as present and
    /// is only fetched.
    pub fn decide(endpoint: &CloneEndpoint, target: &Path, bare: bool) -> Self {
        if target.is_dir() {
            SyncAction::Update {
                target: target.to_path_buf(),
            }
        } else {
            SyncAction::Clone {
                endpoint: endpoint.clone(),
                target: target.to_path_buf(),
                bare,
            }
        }
    }

    /// Arguments passed to git, without the program name.
    pub fn args(&self) -> Vec<OsString> {
        match self {
            SyncAction::Clone {
                endpoint,
                target,
                bare,
            } => {
                let mut args: Vec<OsString> =
                    vec!["clone".into(), "-q".into(), "--mirror".into()];
                // Additive: mirror semantics stay, bare is layered on top
                if *bare {
                    args.push("--bare".into());
                }
                args.push(endpoint.as_str().into());
                args.push(target.as_os_str().to_os_string());
                args
            }
            SyncAction::Update { .. } => vec!["fetch".into(), "--all".into(), "-q".into()],
        }
    }

    /// Directory git must run in.
    pub fn working_dir(&self) -> Option<&Path> {
        match self {
            SyncAction::Clone { .. } => None,
            SyncAction::Update { target } => Some(target),
        }
    }

    pub fn target(&self) -> &Path {
        match self {
            SyncAction::Clone { target, .. } | SyncAction::Update { target } => target,
        }
    }

    pub fn is_clone(&self) -> bool {
        matches!(self, SyncAction::Clone { .. })
    }

    /// Short verb for listings: `clone` or `update`.
    pub fn verb(&self) -> &'static str {
        match self {
            SyncAction::Clone { .. } => "clone",
            SyncAction::Update { .. } => "update",
        }
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(dir) = self.working_dir() {
            write!(f, "cd {} && ", dir.display())?;
        }
        write!(f, "git")?;
        for arg in self.args() {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Outcome of syncing one repository. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Success { action: SyncAction },
    Failure { action: SyncAction, stderr: String },
}

impl SyncOutcome {
    pub fn action(&self) -> &SyncAction {
        match self {
            SyncOutcome::Success { action } | SyncOutcome::Failure { action, .. } => action,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SyncOutcome::Success { .. })
    }
}

/// Clone or update the mirror at `target`.
///
/// Never fails: a git error or a spawn error becomes
/// [`SyncOutcome::Failure`] carrying the captured error text.
pub fn sync(
    git: &dyn GitOperations,
    endpoint: &CloneEndpoint,
    target: &Path,
    bare: bool,
) -> SyncOutcome {
    let action = SyncAction::decide(endpoint, target, bare);
    debug!("{}", action);

    match git.invoke(&action.args(), action.working_dir()) {
        Ok(invocation) if invocation.success => SyncOutcome::Success { action },
        Ok(invocation) => {
            let mut stderr = invocation.stderr.trim_end().to_string();
            if stderr.is_empty() {
                stderr = match invocation.code {
                    Some(code) => format!("git exited with status {}", code),
                    None => "git was terminated by a signal".to_string(),
                };
            }
            SyncOutcome::Failure { action, stderr }
        }
        Err(e) => SyncOutcome::Failure {
            action,
            stderr: e.to_string(),
        },
    }
}
