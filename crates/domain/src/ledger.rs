//! Posted-content ledger used for deduplication
//!
//! The in-memory map is authoritative for the lifetime of the process. Every
//! mutation is written through to the [`LedgerStore`]; a failed write is
//! logged and the process keeps running with in-memory dedup only.

use std::sync::Arc;
use time::Duration;

use crate::model::{LedgerEntries, LedgerEntry};
use crate::ports::{Clock, LedgerStore, PostedLookup};

/// Default retention window for ledger entries
pub const DEFAULT_RETENTION: Duration = Duration::days(30);

pub struct Ledger {
    entries: LedgerEntries,
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
}

impl Ledger {
    /// Load the ledger from its store and prune it.
    ///
    /// A missing or unreadable store yields an empty ledger.
    pub fn open(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>, retention: Duration) -> Self {
        let entries = match store.load() {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load ledger, starting empty");
                LedgerEntries::new()
            }
        };

        let mut ledger = Self {
            entries,
            store,
            clock,
        };

        tracing::info!(entries = ledger.entries.len(), "Ledger loaded");

        ledger.prune(retention);
        ledger
    }

    /// True if the id has an entry, regardless of its age
    pub fn is_duplicate(&self, content_id: &str) -> bool {
        self.entries.contains_key(content_id)
    }

    /// Record that the id was posted now, then persist
    pub fn mark_posted(&mut self, content_id: &str) {
        let entry = LedgerEntry {
            posted_at: self.clock.now(),
        };
        self.entries.insert(content_id.to_string(), entry);
        self.persist();
    }

    /// Remove entries older than `retention`. Returns how many were removed.
    ///
    /// An entry whose age equals `retention` exactly is kept.
    pub fn prune(&mut self, retention: Duration) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();

        self.entries
            .retain(|_, entry| now - entry.posted_at <= retention);

        let removed = before - self.entries.len();
        if removed > 0 {
            tracing::info!(removed = removed, "Pruned old ledger entries");
            self.persist();
        }
        removed
    }

    pub fn get(&self, content_id: &str) -> Option<&LedgerEntry> {
        self.entries.get(content_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries ordered newest first
    pub fn entries(&self) -> Vec<(&str, LedgerEntry)> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|(id, entry)| (id.as_str(), *entry))
            .collect();
        entries.sort_by(|a, b| b.1.posted_at.cmp(&a.1.posted_at).then(a.0.cmp(b.0)));
        entries
    }

    fn persist(&self) {
        if let Err(e) = self.store.save(&self.entries) {
            tracing::error!(
                error = %e,
                "Failed to persist ledger, dedup state will not survive a restart"
            );
        }
    }
}

impl PostedLookup for Ledger {
    fn is_posted(&self, content_id: &str) -> bool {
        self.is_duplicate(content_id)
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("entries", &self.entries.len())
            .finish()
    }
}
