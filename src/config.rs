//! Options controlling how a store file is discovered.
//!
//! Embedding tools can deserialize `Options` from their own JSON config;
//! every field is optional and falls back to the defaults below.

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Discovery options for the store locator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Options {
    /// Reserved filename that marks the store file (defaults to `.markvar`).
    #[serde(default = "default_file_name")]
    pub file_name: String,
    /// Descend into symlinked directories (defaults to false).
    /// Cycles are broken with a canonical-path visited set when enabled.
    #[serde(default)]
    pub follow_symlinks: bool,
    /// Maximum directory depth to search. The root is depth 0.
    /// `None` searches the whole subtree.
    #[serde(default)]
    pub max_depth: Option<usize>,
}

fn default_file_name() -> String {
    crate::STORE_FILE_NAME.to_string()
}

impl Default for Options {
    fn default() -> Self {
        Self {
            file_name: default_file_name(),
            follow_symlinks: false,
            max_depth: None,
        }
    }
}

impl Options {
    /// Parse options from a JSON object, e.g. a `"markvar"` section of a
    /// larger tool config.
    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        serde_json::from_str(content).context("Failed to parse markvar options")
    }

    /// Use a different reserved filename.
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = name.into();
        self
    }

    /// Cap the search depth.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Enable or disable following symlinked directories.
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = Options::default();
        assert_eq!(opts.file_name, ".markvar");
        assert!(!opts.follow_symlinks);
        assert_eq!(opts.max_depth, None);
    }

    #[test]
    fn test_from_json_empty_object_uses_defaults() {
        let opts = Options::from_json("{}").unwrap();
        assert_eq!(opts, Options::default());
    }

    #[test]
    fn test_from_json_partial() {
        let opts = Options::from_json(r#"{"max_depth": 2, "follow_symlinks": true}"#).unwrap();
        assert_eq!(opts.file_name, ".markvar");
        assert!(opts.follow_symlinks);
        assert_eq!(opts.max_depth, Some(2));
    }

    #[test]
    fn test_from_json_rejects_wrong_types() {
        assert!(Options::from_json(r#"{"max_depth": "deep"}"#).is_err());
    }

    #[test]
    fn test_builders() {
        let opts = Options::default()
            .with_file_name(".vars")
            .with_max_depth(1)
            .with_follow_symlinks(true);
        assert_eq!(opts.file_name, ".vars");
        assert_eq!(opts.max_depth, Some(1));
        assert!(opts.follow_symlinks);
    }
}
