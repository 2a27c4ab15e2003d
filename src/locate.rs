//! Discovery and lazy creation of the store file beneath a root directory.
//!
//! The whole subtree is searched for entries named like the store file.
//! Symlinked directories are skipped unless `Options::follow_symlinks` is
//! set, in which case a canonical-path visited set stops cycles.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::Options;

/// Result of resolving the store location for a root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Exactly one store file exists (or was just created).
    Found(PathBuf),
    /// More than one store file exists. Nothing was created.
    Ambiguous(Vec<PathBuf>),
}

/// Collect every store file under `root`, sorted.
///
/// Fails only when `root` itself cannot be read as a directory. Unreadable
/// subdirectories are skipped.
pub fn find_store_files(root: &Path, opts: &Options) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(root)
        .with_context(|| format!("Failed to read root directory: {}", root.display()))?;

    let mut visited = HashSet::new();
    if opts.follow_symlinks {
        visited.insert(root.canonicalize().unwrap_or_else(|_| root.to_path_buf()));
    }

    let mut found = Vec::new();
    scan_entries(entries, opts, 0, &mut visited, &mut found);
    found.sort();
    Ok(found)
}

fn scan_dir(
    dir: &Path,
    opts: &Options,
    depth: usize,
    visited: &mut HashSet<PathBuf>,
    found: &mut Vec<PathBuf>,
) {
    match fs::read_dir(dir) {
        Ok(entries) => scan_entries(entries, opts, depth, visited, found),
        Err(e) => debug!(path = %dir.display(), error = %e, "skipping unreadable directory"),
    }
}

fn scan_entries(
    entries: fs::ReadDir,
    opts: &Options,
    depth: usize,
    visited: &mut HashSet<PathBuf>,
    found: &mut Vec<PathBuf>,
) {
    for entry in entries.flatten() {
        let path = entry.path();
        // file_type() does not follow symlinks
        let Ok(file_type) = entry.file_type() else {
            continue;
        };

        let is_dir = if file_type.is_symlink() {
            path.is_dir()
        } else {
            file_type.is_dir()
        };

        if !is_dir {
            if entry.file_name() == opts.file_name.as_str() {
                found.push(path);
            }
            continue;
        }

        if opts.max_depth.is_some_and(|max| depth >= max) {
            continue;
        }

        if file_type.is_symlink() {
            if !opts.follow_symlinks {
                continue;
            }
            let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());
            if !visited.insert(canonical) {
                continue; // Cycle detected
            }
        } else if opts.follow_symlinks {
            // Real directories are recorded too so a link back into them
            // is not walked twice.
            let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());
            if !visited.insert(canonical) {
                continue;
            }
        }

        scan_dir(&path, opts, depth + 1, visited, found);
    }
}

/// Create an empty store file at `root/<file_name>`.
///
/// Opens in append mode so a file that appeared concurrently is never
/// truncated.
pub fn create_store_file(root: &Path, opts: &Options) -> Result<PathBuf> {
    let path = root.join(&opts.file_name);
    OpenOptions::new()
        .append(true)
        .create(true)
        .open(&path)
        .with_context(|| format!("Failed to create store file: {}", path.display()))?;
    Ok(path)
}

/// Find the one store file under `root`, creating it if none exists.
///
/// After creating a file the subtree is scanned again so a concurrent
/// creator elsewhere in the tree shows up as ambiguity.
pub fn resolve(root: &Path, opts: &Options) -> Result<Resolution> {
    let mut found = find_store_files(root, opts)?;

    match found.len() {
        1 => {
            let path = found.remove(0);
            debug!(path = %path.display(), "resolved store file");
            Ok(Resolution::Found(path))
        }
        0 => {
            let created = create_store_file(root, opts)?;
            info!(path = %created.display(), "no store file found, created one");

            let found = find_store_files(root, opts)?;
            if found.len() > 1 {
                warn_ambiguous(root, opts, &found);
                return Ok(Resolution::Ambiguous(found));
            }
            Ok(Resolution::Found(created))
        }
        _ => {
            warn_ambiguous(root, opts, &found);
            Ok(Resolution::Ambiguous(found))
        }
    }
}

fn warn_ambiguous(root: &Path, opts: &Options, found: &[PathBuf]) {
    let listing = found
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    warn!(
        root = %root.display(),
        count = found.len(),
        files = %listing,
        "found more than one {} file; delete all but one",
        opts.file_name
    );
}
