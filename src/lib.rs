//! `markvar` — Shared `.markvar` variable store for a directory tree.
//!
//! Provides:
//! - `locate` — Find the one `.markvar` file under a root, creating it if missing
//! - `lock` — Exclusive advisory locking of the store file with a RAII guard
//! - `store` — Parse-or-default record handling and lock-protected rewrites
//! - `session` — Cached resolution with sticky failure, and the `mark` entry point
//! - `render` — `{{var:NAME}}` placeholder substitution
//! - `config` — Discovery options
//!
//! ```no_run
//! use std::path::Path;
//!
//! let mut session = markvar::Session::new();
//! session.mark("name", "alice", Path::new("/tmp/proj"))?;
//! # Ok::<(), markvar::MarkError>(())
//! ```

pub mod config;
pub mod locate;
pub mod lock;
pub mod render;
pub mod session;
pub mod store;

pub use config::Options;
pub use session::{MarkError, Session};
pub use store::Record;

/// Reserved store file name.
pub const STORE_FILE_NAME: &str = ".markvar";
