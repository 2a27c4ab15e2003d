//! `{{var:NAME}}` placeholder substitution.
//!
//! Known names are replaced by their stored value. Unknown placeholders are
//! dropped from the output and reported so the caller can warn about them.
//! Substituted values are emitted as-is and never re-scanned.

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::store::Record;

const OPEN: &str = "{{var:";
const CLOSE: &str = "}}";

/// Output of rendering a document against a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub output: String,
    /// Record keys that no placeholder referenced, sorted.
    pub unused: Vec<String>,
    /// Placeholders with no matching key, in first-seen order without repeats.
    pub unmatched: Vec<String>,
}

/// Substitute every placeholder in `content` using `record`.
pub fn render(content: &str, record: &Record) -> Rendered {
    let mut output = String::with_capacity(content.len());
    let mut used = BTreeSet::new();
    let mut unmatched: Vec<String> = Vec::new();
    let mut rest = content;

    while let Some(start) = rest.find(OPEN) {
        let after_open = &rest[start + OPEN.len()..];
        let Some(end) = after_open.find(CLOSE) else {
            break;
        };

        output.push_str(&rest[..start]);
        let name = &after_open[..end];
        match record.get(name) {
            Some(value) => {
                output.push_str(value);
                used.insert(name);
            }
            None => {
                let tag = format!("{OPEN}{name}{CLOSE}");
                if !unmatched.contains(&tag) {
                    unmatched.push(tag);
                }
            }
        }
        rest = &after_open[end + CLOSE.len()..];
    }
    output.push_str(rest);

    let unused = record
        .keys()
        .filter(|k| !used.contains(k.as_str()))
        .cloned()
        .collect();

    Rendered {
        output,
        unused,
        unmatched,
    }
}

/// Path the rendered copy of `source` is written to: `<source>.updated`.
pub fn output_path(source: &Path) -> PathBuf {
    let mut name = source.as_os_str().to_owned();
    name.push(".updated");
    PathBuf::from(name)
}

/// Render `source` and write the result to [`output_path`].
///
/// The source file is left untouched. Unused keys and unmatched placeholders
/// are logged as warnings and returned.
pub fn render_file(source: &Path, record: &Record) -> Result<(PathBuf, Rendered)> {
    let content = std::fs::read_to_string(source)
        .with_context(|| format!("Failed to read document: {}", source.display()))?;

    let rendered = render(&content, record);
    if !rendered.unused.is_empty() {
        warn!(path = %source.display(), keys = ?rendered.unused, "unused variables in store");
    }
    if !rendered.unmatched.is_empty() {
        warn!(
            path = %source.display(),
            placeholders = ?rendered.unmatched,
            "placeholders without a variable were removed"
        );
    }

    let out = output_path(source);
    std::fs::write(&out, &rendered.output)
        .with_context(|| format!("Failed to write rendered document: {}", out.display()))?;
    Ok((out, rendered))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_replaces_known() {
        let r = render(
            "Hi {{var:name}}, you are {{var:age}}. Bye {{var:name}}.",
            &record(&[("name", "alice"), ("age", "30")]),
        );
        assert_eq!(r.output, "Hi alice, you are 30. Bye alice.");
        assert!(r.unused.is_empty());
        assert!(r.unmatched.is_empty());
    }

    #[test]
    fn test_render_drops_unknown_and_reports() {
        let r = render(
            "a{{var:missing}}b{{var:missing}}c{{var:other}}",
            &record(&[("unused", "x")]),
        );
        assert_eq!(r.output, "abc");
        assert_eq!(r.unused, vec!["unused".to_string()]);
        assert_eq!(
            r.unmatched,
            vec!["{{var:missing}}".to_string(), "{{var:other}}".to_string()]
        );
    }

    #[test]
    fn test_render_values_not_rescanned() {
        let r = render("{{var:a}}", &record(&[("a", "{{var:b}}"), ("b", "nope")]));
        assert_eq!(r.output, "{{var:b}}");
        assert_eq!(r.unused, vec!["b".to_string()]);
    }

    #[test]
    fn test_render_unclosed_kept_verbatim() {
        let r = render("x {{var:name} y", &record(&[("name", "alice")]));
        assert_eq!(r.output, "x {{var:name} y");
        assert_eq!(r.unused, vec!["name".to_string()]);
    }

    #[test]
    fn test_render_no_placeholders() {
        let r = render("plain text", &Record::new());
        assert_eq!(r.output, "plain text");
    }

    #[test]
    fn test_render_file_writes_updated_copy() {
        let tmp = tempfile::tempdir().unwrap();
        let doc = tmp.path().join("README.md");
        std::fs::write(&doc, "# {{var:title}}\n").unwrap();

        let (out, rendered) = render_file(&doc, &record(&[("title", "Hello")])).unwrap();
        assert_eq!(out, tmp.path().join("README.md.updated"));
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "# Hello\n");
        assert_eq!(rendered.output, "# Hello\n");
        // Source untouched
        assert_eq!(std::fs::read_to_string(&doc).unwrap(), "# {{var:title}}\n");
    }

    #[test]
    fn test_render_file_missing_source() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(render_file(&tmp.path().join("nope.md"), &Record::new()).is_err());
    }
}
