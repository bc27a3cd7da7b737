//! # Backup Configuration
//!
//! This module loads the configuration file that tells `git-backup` where the
//! repository listing lives and where mirrors should be written. The file is
//! a plain key-value document, TOML by default or YAML when the file name
//! ends in `.yaml`/`.yml`:
//!
//! ```toml
//! request_url = "https://api.github.com/orgs/acme/repos"
//! backup_dir = "/srv/backup/acme"
//! clone_bare = false
//! jobs = 4
//! git_timeout = 600
//! ```
//!
//! Loading happens in two steps. The file is deserialized into a
//! [`RawConfig`] where every key is optional, then [`RawConfig::validate`]
//! checks it eagerly and produces an immutable [`BackupConfig`]. Any problem
//! is fatal to the run and reported with a named [`Error`] variant before a
//! single repository is touched.
//!
//! The camel case spellings used by older configurations (`requestUrl`,
//! `backupDir`, `cloneBare`) are accepted as aliases.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Name of the config file looked up in the user's config directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Keys accepted in the configuration file.
const KNOWN_KEYS: &str = "request_url, backup_dir, clone_bare, jobs, git_timeout, git";

/// On-disk shape of the configuration, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    /// URL returning the JSON array of repositories.
    #[serde(default, alias = "requestUrl")]
    pub request_url: Option<String>,
    /// Root directory that receives the mirrors. Must already exist.
    #[serde(default, alias = "backupDir")]
    pub backup_dir: Option<PathBuf>,
    /// Use the bare layout (`<name>.git`) and pass `--bare` to git.
    #[serde(default, alias = "cloneBare")]
    pub clone_bare: Option<bool>,
    /// Number of repositories synced at the same time.
    #[serde(default)]
    pub jobs: Option<usize>,
    /// Seconds after which a git command is killed. 0 disables the timeout.
    #[serde(default)]
    pub git_timeout: Option<u64>,
    /// git executable to run.
    #[serde(default)]
    pub git: Option<PathBuf>,
}

/// Validated configuration. Loaded once and never changed during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupConfig {
    pub request_url: Url,
    pub backup_dir: PathBuf,
    pub clone_bare: bool,
    pub jobs: usize,
    pub git_timeout: Option<Duration>,
    pub git_program: PathBuf,
}

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
}

impl ConfigFormat {
    /// Pick the format from a file extension, defaulting to TOML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                ConfigFormat::Yaml
            }
            _ => ConfigFormat::Toml,
        }
    }
}

/// Default config location: `<config dir>/git-backup/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("git-backup").join(DEFAULT_CONFIG_FILE))
}

impl RawConfig {
    /// Parse `content` without validating it.
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        match format {
            ConfigFormat::Toml => {
                toml::from_str::<RawConfig>(content).map_err(|e| parse_error(e.to_string()))
            }
            ConfigFormat::Yaml => {
                // An empty YAML document deserializes to unit, not a mapping
                if content.trim().is_empty() {
                    return Ok(RawConfig::default());
                }
                serde_yaml::from_str::<RawConfig>(content).map_err(|e| parse_error(e.to_string()))
            }
        }
    }

    /// Check every value and build the immutable configuration.
    ///
    /// A relative `backup_dir` is resolved against `base_dir`, normally the
    /// directory holding the config file.
    pub fn validate(self, base_dir: Option<&Path>) -> Result<BackupConfig> {
        let raw_url = self
            .request_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or(Error::MissingConfigValue { key: "request_url" })?;

        let request_url = Url::parse(raw_url).map_err(|e| Error::InvalidRequestUrl {
            url: raw_url.to_string(),
            message: e.to_string(),
        })?;
        if !matches!(request_url.scheme(), "http" | "https") {
            return Err(Error::InvalidRequestUrl {
                url: raw_url.to_string(),
                message: format!("unsupported scheme '{}'", request_url.scheme()),
            });
        }

        let backup_dir = self
            .backup_dir
            .filter(|dir| !dir.as_os_str().is_empty())
            .ok_or(Error::MissingConfigValue { key: "backup_dir" })?;
        let backup_dir = match base_dir {
            Some(base) if backup_dir.is_relative() => base.join(backup_dir),
            _ => backup_dir,
        };
        if !backup_dir.is_dir() {
            return Err(Error::BackupDirInvalid { path: backup_dir });
        }

        let jobs = match self.jobs {
            Some(0) => {
                return Err(Error::ConfigParse {
                    message: "jobs must be at least 1".to_string(),
                    hint: Some("Remove 'jobs' to sync one repository at a time".to_string()),
                })
            }
            Some(jobs) => jobs,
            None => 1,
        };

        Ok(BackupConfig {
            request_url,
            backup_dir,
            clone_bare: self.clone_bare.unwrap_or(false),
            jobs,
            git_timeout: self
                .git_timeout
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            git_program: self.git.unwrap_or_else(|| PathBuf::from("git")),
        })
    }
}

fn parse_error(message: String) -> Error {
    let hint = message
        .contains("unknown field")
        .then(|| format!("Known keys are: {}", KNOWN_KEYS));
    Error::ConfigParse { message, hint }
}

impl BackupConfig {
    /// Load and validate a configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let raw = RawConfig::parse(&content, ConfigFormat::from_path(path))?;
        raw.validate(path.parent())
    }

    /// Parse and validate configuration text, resolving relative paths
    /// against the current directory.
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        RawConfig::parse(content, format)?.validate(None)
    }

    /// Apply command line overrides, producing a new configuration.
    pub fn with_overrides(mut self, jobs: Option<usize>, git_timeout: Option<u64>) -> Result<Self> {
        if let Some(jobs) = jobs {
            if jobs == 0 {
                return Err(Error::ConfigParse {
                    message: "--jobs must be at least 1".to_string(),
                    hint: None,
                });
            }
            self.jobs = jobs;
        }
        if let Some(secs) = git_timeout {
            self.git_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        Ok(self)
    }
}
