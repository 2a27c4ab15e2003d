//! Exclusive advisory locking of the store file.
//!
//! The lock is taken on the store file itself (`flock`-style, whole file)
//! and belongs to the open file description, so two handles in the same
//! process contend just like two processes do. Locks are advisory and are
//! not guaranteed to work across network filesystems.
//!
//! Provides a RAII guard that releases the lock on drop.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// RAII guard holding an exclusive lock on an open store file.
///
/// The lock is not re-entrant: acquiring it again through a second handle
/// while this guard is alive blocks forever.
pub struct LockGuard {
    file: File,
    path: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(path = %self.path.display(), error = %e, "failed to release store lock");
        } else {
            debug!(path = %self.path.display(), "released store lock");
        }
    }
}

impl LockGuard {
    /// Get the path of the locked file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Mutable access to the locked handle for reading and rewriting.
    pub fn file_mut(&mut self) -> &mut File {
        &mut self.file
    }
}

/// Open `path` for read and write (never creating or truncating it) and
/// block until an exclusive lock is held.
///
/// There is no timeout. Callers that need bounded latency must wrap the call.
pub fn acquire(path: &Path) -> Result<LockGuard> {
    let file = open_store(path)?;
    file.lock_exclusive()
        .with_context(|| format!("Failed to lock store file: {}", path.display()))?;
    debug!(path = %path.display(), "acquired store lock");

    Ok(LockGuard {
        file,
        path: path.to_path_buf(),
    })
}

/// Try to take the exclusive lock without blocking.
///
/// Returns `Ok(None)` if another handle currently holds it.
pub fn try_acquire(path: &Path) -> Result<Option<LockGuard>> {
    let file = open_store(path)?;
    match file.try_lock_exclusive() {
        Ok(()) => Ok(Some(LockGuard {
            file,
            path: path.to_path_buf(),
        })),
        Err(e) if is_contended(&e) => Ok(None),
        Err(e) => {
            Err(e).with_context(|| format!("Failed to lock store file: {}", path.display()))
        }
    }
}

/// Check whether some handle currently holds the lock on `path`.
pub fn is_locked(path: &Path) -> Result<bool> {
    Ok(try_acquire(path)?.is_none())
}

fn open_store(path: &Path) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .with_context(|| format!("Failed to open store file: {}", path.display()))
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
