//! JSON file ledger store
//!
//! File layout: `{ "<content_id>": { "timestamp": "<ISO-8601>" } }`.
//! Writes go to a sibling temp file which is then renamed over the target.

use cosmos_poster_domain::{LedgerEntries, LedgerEntry, LedgerError, LedgerStore};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use time::format_description::FormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

/// Offset-less timestamps written by earlier versions, read as UTC
const NAIVE_FRACTIONAL: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");
const NAIVE: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    timestamp: String,
}

/// Ledger store backed by a single JSON file
#[derive(Debug, Clone)]
pub struct JsonFileLedgerStore {
    path: PathBuf,
}

impl JsonFileLedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "ledger.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl LedgerStore for JsonFileLedgerStore {
    fn load(&self) -> Result<LedgerEntries, LedgerError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No ledger file yet");
                return Ok(LedgerEntries::new());
            }
            Err(e) => return Err(LedgerError::Io(e)),
        };

        let stored: HashMap<String, StoredEntry> =
            serde_json::from_str(&contents).map_err(|e| LedgerError::Malformed(e.to_string()))?;

        let mut entries = LedgerEntries::with_capacity(stored.len());
        for (content_id, entry) in stored {
            match parse_timestamp(&entry.timestamp) {
                Some(posted_at) => {
                    entries.insert(content_id, LedgerEntry { posted_at });
                }
                None => {
                    tracing::warn!(
                        content_id = %content_id,
                        timestamp = %entry.timestamp,
                        "Dropping ledger entry with unreadable timestamp"
                    );
                }
            }
        }

        Ok(entries)
    }

    fn save(&self, entries: &LedgerEntries) -> Result<(), LedgerError> {
        let mut stored = BTreeMap::new();
        for (content_id, entry) in entries {
            let timestamp = entry
                .posted_at
                .format(&Rfc3339)
                .map_err(|e| LedgerError::Serialization(e.to_string()))?;
            stored.insert(content_id.as_str(), StoredEntry { timestamp });
        }

        let json = serde_json::to_string_pretty(&stored)
            .map_err(|e| LedgerError::Serialization(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp_path = self.temp_path();
        if let Err(e) = replace_via(&temp_path, &self.path, json.as_bytes()) {
            if let Err(cleanup) = fs::remove_file(&temp_path) {
                if cleanup.kind() != ErrorKind::NotFound {
                    tracing::warn!(
                        path = %temp_path.display(),
                        error = %cleanup,
                        "Failed to remove ledger temp file"
                    );
                }
            }
            return Err(LedgerError::Io(e));
        }
        Ok(())
    }
}

/// Write `bytes` to `temp_path`, flush to disk, then rename over `target`
fn replace_via(temp_path: &Path, target: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(temp_path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);
    fs::rename(temp_path, target)
}

fn parse_timestamp(value: &str) -> Option<OffsetDateTime> {
    let value = value.trim();
    OffsetDateTime::parse(value, &Rfc3339)
        .ok()
        .or_else(|| {
            PrimitiveDateTime::parse(value, NAIVE_FRACTIONAL)
                .or_else(|_| PrimitiveDateTime::parse(value, NAIVE))
                .ok()
                .map(PrimitiveDateTime::assume_utc)
        })
}
