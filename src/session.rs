//! Resolution cache and the public update surface.
//!
//! A `Session` remembers the resolved store location so repeated calls skip
//! the directory scan. Finding more than one store file disables the session
//! for good: every later call fails fast without touching the disk. I/O
//! errors are not sticky and a later call may succeed. If the cached store
//! file has disappeared, the cache is dropped and the next call rediscovers.
//!
//! The location is cached once per session regardless of the `root_dir`
//! passed to later calls. Use one session per root.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, warn};

use crate::config::Options;
use crate::locate::{self, Resolution};
use crate::render::{self, Rendered};
use crate::store::{self, Record};

#[derive(Debug, Error)]
pub enum MarkError {
    #[error(
        "found {} store files under {}, delete all but one:\n  {}",
        .paths.len(),
        .root.display(),
        join_paths(.paths)
    )]
    AmbiguousStore { root: PathBuf, paths: Vec<PathBuf> },

    #[error("store updates are disabled for this session after an earlier failure")]
    Disabled,

    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

impl MarkError {
    /// Whether retrying in the same session can never succeed.
    pub fn is_permanent(&self) -> bool {
        matches!(self, MarkError::AmbiguousStore { .. } | MarkError::Disabled)
    }
}

pub type Result<T> = std::result::Result<T, MarkError>;

/// Caller-owned resolution cache with a sticky failure flag.
#[derive(Debug, Default)]
pub struct Session {
    options: Options,
    location: Option<PathBuf>,
    disabled: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: Options) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The cached store location, if resolved.
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// True once an ambiguous store has been seen.
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Return the cached location or run discovery under `root_dir`.
    pub fn resolve(&mut self, root_dir: &Path) -> Result<PathBuf> {
        if self.disabled {
            return Err(MarkError::Disabled);
        }
        if let Some(path) = &self.location {
            return Ok(path.clone());
        }

        let resolution = locate::resolve(root_dir, &self.options).map_err(|e| {
            error!(
                root = %root_dir.display(),
                error = %format!("{e:#}"),
                "unable to locate or create store file"
            );
            MarkError::Io(e)
        })?;

        match resolution {
            Resolution::Found(path) => {
                self.location = Some(path.clone());
                Ok(path)
            }
            Resolution::Ambiguous(paths) => {
                self.disabled = true;
                error!(root = %root_dir.display(), "unable to locate store file, disabling updates");
                Err(MarkError::AmbiguousStore {
                    root: root_dir.to_path_buf(),
                    paths,
                })
            }
        }
    }

    /// Set `var` to `data` in the store under `root_dir`.
    pub fn mark(&mut self, var: &str, data: &str, root_dir: &Path) -> Result<()> {
        let path = self.resolve(root_dir)?;
        store::upsert(&path, var, data)
            .map(|_| ())
            .map_err(|e| self.store_failure(&path, e))
    }

    /// Read one variable.
    pub fn get(&mut self, var: &str, root_dir: &Path) -> Result<Option<String>> {
        Ok(self.list(root_dir)?.remove(var))
    }

    /// Read every variable.
    pub fn list(&mut self, root_dir: &Path) -> Result<Record> {
        let path = self.resolve(root_dir)?;
        store::read(&path).map_err(|e| self.store_failure(&path, e))
    }

    /// Delete `var`. Returns whether it existed.
    pub fn remove(&mut self, var: &str, root_dir: &Path) -> Result<bool> {
        let path = self.resolve(root_dir)?;
        store::remove(&path, var).map_err(|e| self.store_failure(&path, e))
    }

    /// Render `{{var:NAME}}` placeholders in `document` into
    /// `<document>.updated` using the current record.
    pub fn render_file(
        &mut self,
        document: &Path,
        root_dir: &Path,
    ) -> Result<(PathBuf, Rendered)> {
        let record = self.list(root_dir)?;
        render::render_file(document, &record).map_err(|e| io_failure(document, e))
    }

    /// Report a store access failure, forgetting the cached location when
    /// the file no longer exists.
    fn store_failure(&mut self, path: &Path, e: anyhow::Error) -> MarkError {
        let missing = e
            .chain()
            .filter_map(|cause| cause.downcast_ref::<io::Error>())
            .any(|err| err.kind() == io::ErrorKind::NotFound);
        if missing {
            warn!(path = %path.display(), "cached store file is gone, will rediscover");
            self.location = None;
        }
        io_failure(path, e)
    }
}

fn io_failure(path: &Path, e: anyhow::Error) -> MarkError {
    error!(path = %path.display(), error = %format!("{e:#}"), "unable to access store file");
    MarkError::Io(e)
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join("\n  ")
}
