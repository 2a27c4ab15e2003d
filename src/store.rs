//! The store record and its lock-protected read-modify-write.
//!
//! The record is a flat JSON object of string keys to string values,
//! pretty-printed so the file stays diffable and hand-editable. Content that
//! does not parse is treated as an empty record and is replaced by the next
//! write; partially valid content is discarded, not salvaged.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::warn;

use crate::lock;

/// Key/value mapping persisted in the store file. Sorted by key on disk.
pub type Record = BTreeMap<String, String>;

/// Outcome of parsing store content.
#[derive(Debug)]
pub enum Parsed {
    /// Content held a valid record.
    Record(Record),
    /// Content was empty or whitespace only.
    Empty,
    /// Content was not a valid record.
    Malformed(serde_json::Error),
}

impl Parsed {
    /// Parse raw store bytes without failing.
    ///
    /// Bytes that are not valid UTF-8 count as malformed, not as an I/O error.
    pub fn parse(content: impl AsRef<[u8]>) -> Self {
        let content = content.as_ref();
        if content.iter().all(u8::is_ascii_whitespace) {
            return Parsed::Empty;
        }
        match serde_json::from_slice(content) {
            Ok(record) => Parsed::Record(record),
            Err(e) => Parsed::Malformed(e),
        }
    }

    /// Collapse to a record, starting empty when the content was unusable.
    pub fn into_record(self, path: &Path) -> Record {
        match self {
            Parsed::Record(record) => record,
            Parsed::Empty => Record::new(),
            Parsed::Malformed(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "store file is not a valid record, starting from an empty one"
                );
                Record::new()
            }
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Parsed::Malformed(_))
    }
}

/// Serialize a record as indented JSON with a trailing newline.
pub fn to_string(record: &Record) -> Result<String> {
    let mut json =
        serde_json::to_string_pretty(record).context("Failed to serialize store record")?;
    json.push('\n');
    Ok(json)
}

/// Read the record from the locked file, starting at offset 0.
fn read_locked(file: &mut File, path: &Path) -> Result<Record> {
    file.seek(SeekFrom::Start(0))
        .with_context(|| format!("Failed to seek store file: {}", path.display()))?;
    let mut content = Vec::new();
    file.read_to_end(&mut content)
        .with_context(|| format!("Failed to read store file: {}", path.display()))?;
    Ok(Parsed::parse(&content).into_record(path))
}

/// Replace the whole content of the locked file and flush it to disk.
fn write_locked(file: &mut File, path: &Path, record: &Record) -> Result<()> {
    let json = to_string(record)?;
    file.seek(SeekFrom::Start(0))
        .with_context(|| format!("Failed to seek store file: {}", path.display()))?;
    file.set_len(0)
        .with_context(|| format!("Failed to truncate store file: {}", path.display()))?;
    file.write_all(json.as_bytes())
        .with_context(|| format!("Failed to write store file: {}", path.display()))?;
    file.sync_all()
        .with_context(|| format!("Failed to flush store file: {}", path.display()))?;
    Ok(())
}

/// Read the record under the exclusive lock.
pub fn read(path: &Path) -> Result<Record> {
    let mut guard = lock::acquire(path)?;
    read_locked(guard.file_mut(), path)
}

/// Read-modify-write with lock protection.
///
/// 1. Opens `path` (no truncation) and blocks on the exclusive lock
/// 2. Reads the current record (empty if missing content or malformed)
/// 3. Applies `f`, which returns whether the record changed and a result
/// 4. Rewrites the file in full if it changed
/// 5. Releases the lock (via RAII guard drop)
pub fn modify<R, F>(path: &Path, f: F) -> Result<R>
where
    F: FnOnce(&mut Record) -> (bool, R),
{
    let mut guard = lock::acquire(path)?;
    let mut record = read_locked(guard.file_mut(), path)?;
    let (changed, out) = f(&mut record);
    if changed {
        write_locked(guard.file_mut(), path, &record)?;
    }
    Ok(out)
}

/// Upsert one key. Returns the previous value, if any.
pub fn upsert(path: &Path, key: &str, value: &str) -> Result<Option<String>> {
    modify(path, |record| {
        (true, record.insert(key.to_string(), value.to_string()))
    })
}

/// Delete one key. Returns whether it was present.
pub fn remove(path: &Path, key: &str) -> Result<bool> {
    modify(path, |record| {
        let existed = record.remove(key).is_some();
        (existed, existed)
    })
}
