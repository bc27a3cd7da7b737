//! # Repository Record Resolution
//!
//! Hosting providers describe repositories with different field names:
//! GitHub uses `name` and `clone_url`, GitLab uses `path_with_namespace` and
//! `ssh_url_to_repo`, and so on. This module turns one of those loosely typed
//! records into a strongly typed [`RepositoryIdentifier`] and
//! [`CloneEndpoint`]. Nothing else in the crate looks at the raw record.
//!
//! ## Priority Order
//!
//! The candidate keys are checked in a fixed order and the first non-empty
//! string wins:
//!
//! - identifier: `path_with_namespace`, `path`, `name`
//! - endpoint: `clone_url`, `ssh_url_to_repo`
//!
//! Swapping the order changes which repositories resolve, so it is part of
//! the public contract and covered by tests.

use std::fmt;
use std::path::{Component, Path};

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// A single entry of the repository listing, as decoded from JSON.
pub type RepositoryRecord = Map<String, Value>;

/// Keys consulted for the repository identifier, highest priority first.
pub const IDENTIFIER_KEYS: [&str; 3] = ["path_with_namespace", "path", "name"];

/// Keys consulted for the clone endpoint, highest priority first.
pub const ENDPOINT_KEYS: [&str; 2] = ["clone_url", "ssh_url_to_repo"];

/// Slash separated logical path of a repository, e.g. `group/sub/project`.
///
/// Always relative and free of `.`/`..` segments, so joining it onto the
/// backup directory can never leave that directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryIdentifier(String);

impl RepositoryIdentifier {
    /// Validate `raw` and wrap it.
    pub fn parse(raw: &str) -> Result<Self> {
        let reject = |reason: &str| Error::UnsafeIdentifier {
            identifier: raw.to_string(),
            reason: reason.to_string(),
        };

        if raw.is_empty() {
            return Err(reject("empty path"));
        }
        if raw.contains('\0') {
            return Err(reject("contains a NUL byte"));
        }
        if raw.contains('\\') {
            return Err(reject("contains a backslash"));
        }
        if raw.starts_with('/') {
            return Err(reject("absolute path"));
        }

        for segment in raw.split('/') {
            match segment {
                "" => return Err(reject("contains an empty segment")),
                "." => return Err(reject("contains a '.' segment")),
                ".." => return Err(reject("contains a '..' segment")),
                _ => {}
            }
        }

        // Catches platform specific prefixes such as `C:` on Windows.
        if !Path::new(raw)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(reject("not a plain relative path"));
        }

        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The path segments, in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Everything but the final segment, if there is more than one segment.
    pub fn parent(&self) -> Option<&str> {
        self.0.rsplit_once('/').map(|(parent, _)| parent)
    }
}

impl fmt::Display for RepositoryIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// URL or SSH style address used as the clone source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneEndpoint(String);

impl CloneEndpoint {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let endpoint = endpoint.into();
        if endpoint.is_empty() {
            return Err(Error::MissingEndpoint);
        }
        Ok(Self(endpoint))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CloneEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The typed pair extracted from one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRepository {
    pub identifier: RepositoryIdentifier,
    pub endpoint: CloneEndpoint,
}

/// Returns the first key whose value is a non-empty string.
fn first_non_empty<'a>(record: &'a RepositoryRecord, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| record.get(*key).and_then(Value::as_str))
        .find(|value| !value.is_empty())
}

/// Resolve the repository identifier of `record`.
pub fn resolve_identifier(record: &RepositoryRecord) -> Result<RepositoryIdentifier> {
    let raw = first_non_empty(record, &IDENTIFIER_KEYS).ok_or(Error::MissingIdentifier)?;
    RepositoryIdentifier::parse(raw)
}

/// Resolve the clone endpoint of `record`.
pub fn resolve_endpoint(record: &RepositoryRecord) -> Result<CloneEndpoint> {
    let raw = first_non_empty(record, &ENDPOINT_KEYS).ok_or(Error::MissingEndpoint)?;
    CloneEndpoint::new(raw)
}

/// Resolve both the identifier and the endpoint of `record`.
pub fn resolve(record: &RepositoryRecord) -> Result<ResolvedRepository> {
    Ok(ResolvedRepository {
        identifier: resolve_identifier(record)?,
        endpoint: resolve_endpoint(record)?,
    })
}

/// View a listing entry as a record, rejecting non-object JSON values.
pub fn as_record(value: &Value) -> Result<&RepositoryRecord> {
    value.as_object().ok_or_else(|| {
        let mut found = value.to_string();
        if found.len() > 80 {
            let mut cut = 80;
            while !found.is_char_boundary(cut) {
                cut -= 1;
            }
            found.truncate(cut);
            found.push_str("...");
        }
        Error::InvalidRecord { found }
    })
}
