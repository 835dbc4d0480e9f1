//! Only one calhub process may serve a given database file.

use anyhow::{Context, Result};
use calhub_core::DatabaseConfig;
use fs2::FileExt;
use std::fs::File;
use std::path::PathBuf;

/// A lock guard that releases the lock when dropped
pub struct LockGuard {
    _file: File,
}

fn lock_path(database: &DatabaseConfig) -> PathBuf {
    let mut path = database.path.clone().into_os_string();
    path.push(".lock");
    PathBuf::from(path)
}

/// Acquire an exclusive lock next to the database file, failing if another
/// instance holds it. In-memory databases need no lock.
pub fn acquire_lock(database: &DatabaseConfig) -> Result<Option<LockGuard>> {
    if database.is_in_memory() {
        return Ok(None);
    }

    let path = lock_path(database);
    let file = File::create(&path)
        .with_context(|| format!("Failed to create lock file {}", path.display()))?;

    file.try_lock_exclusive().map_err(|_| {
        anyhow::anyhow!(
            "Another calhub instance is already serving {}.\n\
            If you believe this is an error, remove: {}",
            database.path.display(),
            path.display()
        )
    })?;

    Ok(Some(LockGuard { _file: file }))
}
