//! File backup and restore primitives.
//!
//! A backup is the same file moved aside under a well-known suffix:
//! `app.yml` <-> `app.yml.back`. Extensions use the pair to put a file out of
//! the way for the duration of a run and bring it back afterwards.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

/// Suffix appended to a file name to mark a saved original.
pub const BACKUP_SUFFIX: &str = ".back";

/// The backup sibling of `path`: the same file name with `.back` appended.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(BACKUP_SUFFIX);
    path.with_file_name(name)
}

/// Move `path` aside to its `.back` sibling.
///
/// No-op when `path` does not exist, which also makes a repeated call
/// (without an intervening restore) a no-op: the first call already moved
/// the file away.
pub fn backup_file(path: &Path) -> Result<()> {
    if !path.exists() {
        debug!(path = %path.display(), "nothing to back up");
        return Ok(());
    }
    let backup = backup_path(path);
    info!(path = %path.display(), "backup");
    fs::rename(path, &backup)
        .with_context(|| format!("rename {} -> {}", path.display(), backup.display()))?;
    Ok(())
}

/// Move the `.back` sibling of `path` back into place.
///
/// No-op when no backup exists.
pub fn restore_file(path: &Path) -> Result<()> {
    let backup = backup_path(path);
    if !backup.exists() {
        debug!(path = %path.display(), "no backup to restore");
        return Ok(());
    }
    info!(path = %path.display(), "restore");
    fs::rename(&backup, path)
        .with_context(|| format!("rename {} -> {}", backup.display(), path.display()))?;
    Ok(())
}
