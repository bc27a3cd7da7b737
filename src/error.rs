//! # Error Handling
//!
//! This module defines the centralized error type for the `git-backup`
//! library. It uses `thiserror` to build one `Error` enum covering every
//! anticipated failure, each variant carrying the context needed to print a
//! useful diagnostic.
//!
//! Errors fall into two groups:
//!
//! - **Run-level errors** make the whole batch meaningless and are
//!   propagated to the caller: configuration problems (`ConfigNotFound`,
//!   `ConfigParse`, `MissingConfigValue`, `InvalidRequestUrl`,
//!   `BackupDirInvalid`) and listing problems (`Network`, `ListingNotArray`).
//!
//! - **Per-repository errors** are recovered by the batch orchestrator and
//!   end up in the batch report as text: `InvalidRecord`,
//!   `MissingIdentifier`, `MissingEndpoint`, `UnsafeIdentifier`,
//!   `DirectoryCreation` and `GitSpawn`.
//!
//! The `Result` alias is used throughout the library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for git-backup operations
#[derive(Error, Debug)]
pub enum Error {
    /// The configuration file does not exist.
    #[error("The config file {} could not be found", path.display())]
    ConfigNotFound { path: PathBuf },

    /// The configuration file could not be parsed.
    ///
    /// Includes an optional hint about how to fix it.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// A required configuration value is absent or empty.
    #[error("No {key} is configured in the config file")]
    MissingConfigValue { key: &'static str },

    /// The configured request URL is not an absolute http(s) URL.
    #[error("Invalid request_url {url}: {message}")]
    InvalidRequestUrl { url: String, message: String },

    /// The configured backup directory does not exist or is not a directory.
    #[error("The configured backup_dir {} does not exist or is not a directory", path.display())]
    BackupDirInvalid { path: PathBuf },

    /// The repository listing could not be fetched.
    #[error("Network operation error: {url} - {message}")]
    Network { url: String, message: String },

    /// The repository listing decoded to something other than a JSON array.
    #[error("The repository listing is not a JSON array: {body}")]
    ListingNotArray { body: String },

    /// A listing entry is not a JSON object.
    #[error("Repository record is not a JSON object: {found}")]
    InvalidRecord { found: String },

    /// None of the identifier keys held a usable value.
    #[error("The repository path could not be determined (checked path_with_namespace, path, name)")]
    MissingIdentifier,

    /// None of the endpoint keys held a usable value.
    #[error("The clone URL could not be determined (checked clone_url, ssh_url_to_repo)")]
    MissingEndpoint,

    /// The resolved identifier would escape the backup directory or is malformed.
    #[error("Unsafe repository path {identifier:?}: {reason}")]
    UnsafeIdentifier { identifier: String, reason: String },

    /// Intermediate directories for a repository could not be created.
    #[error("Could not create directory {}: {source}", path.display())]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The git executable could not be started.
    #[error("Failed to run {program}: {source}")]
    GitSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON parsing error, wrapped from `serde_json::Error`.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// The worker pool could not be built.
    #[error("Worker pool error: {message}")]
    WorkerPool { message: String },
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_config_parse() {
        let error = Error::ConfigParse {
            message: "expected `=`".to_string(),
            hint: None,
        };
        let display = format!("{}", error);
        assert!(display.contains("Configuration parsing error"));
        assert!(display.contains("expected `=`"));
        assert!(!display.contains("hint:"));
    }

    #[test]
    fn test_error_display_config_parse_with_hint() {
        let error = Error::ConfigParse {
            message: "jobs must be at least 1".to_string(),
            hint: Some("Remove 'jobs' to run sequentially".to_string()),
        };
        let display = format!("{}", error);
        assert!(display.contains("hint:"));
        assert!(display.contains("Remove 'jobs'"));
    }

    #[test]
    fn test_error_display_missing_config_value() {
        let error = Error::MissingConfigValue { key: "request_url" };
        assert_eq!(
            error.to_string(),
            "No request_url is configured in the config file"
        );
    }

    #[test]
    fn test_error_display_backup_dir_invalid() {
        let error = Error::BackupDirInvalid {
            path: PathBuf::from("/srv/missing"),
        };
        let display = error.to_string();
        assert!(display.contains("/srv/missing"));
        assert!(display.contains("does not exist or is not a directory"));
    }

    #[test]
    fn test_error_display_network() {
        let error = Error::Network {
            url: "https://api.github.com/user/repos".to_string(),
            message: "status code 401".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("Network operation error"));
        assert!(display.contains("https://api.github.com/user/repos"));
        assert!(display.contains("401"));
    }

    #[test]
    fn test_error_display_unsafe_identifier() {
        let error = Error::UnsafeIdentifier {
            identifier: "../etc".to_string(),
            reason: "contains a '..' segment".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("\"../etc\""));
        assert!(display.contains("'..'"));
    }

    #[test]
    fn test_error_display_directory_creation() {
        let error = Error::DirectoryCreation {
            path: PathBuf::from("/backup/team"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let display = format!("{}", error);
        assert!(display.contains("/backup/team"));
        assert!(display.contains("denied"));
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let error: Error = io_error.into();
        let display = format!("{}", error);
        assert!(display.contains("I/O error"));
        assert!(display.contains("File not found"));
    }

    #[test]
    fn test_error_from_json_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("[unclosed").unwrap_err();
        let error: Error = json_error.into();
        assert!(error.to_string().contains("JSON parsing error"));
    }
}
