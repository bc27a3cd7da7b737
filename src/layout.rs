//! Mapping repository identifiers onto the backup directory

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::record::RepositoryIdentifier;

/// Suffix appended to the final segment in bare layout.
pub const BARE_SUFFIX: &str = ".git";

/// Compute where `identifier` lives under `backup_root`.
///
/// In bare layout the final segment carries a `.git` suffix, so
/// `team/app` maps to `<root>/team/app.git`.
pub fn target_path(identifier: &RepositoryIdentifier, backup_root: &Path, bare: bool) -> PathBuf {
    let mut path = backup_root.to_path_buf();
    for segment in identifier.segments() {
        path.push(segment);
    }
    if bare {
        let mut name = path.file_name().unwrap_or_default().to_os_string();
        name.push(BARE_SUFFIX);
        path.set_file_name(name);
    }
    path
}

/// Compute the target path and create its missing parent directories.
///
/// The target itself is left alone; whether it exists decides between clone
/// and update later on.
pub fn plan(identifier: &RepositoryIdentifier, backup_root: &Path, bare: bool) -> Result<PathBuf> {
    let target = target_path(identifier, backup_root, bare);

    if identifier.parent().is_some() {
        if let Some(parent) = target.parent() {
            if !parent.is_dir() {
                fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreation {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
    }

    Ok(target)
}
