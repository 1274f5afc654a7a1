//! In-memory ledger store for testing and throwaway runs

use cosmos_poster_domain::{LedgerEntries, LedgerError, LedgerStore};
use std::sync::RwLock;

/// In-memory ledger store implementation
pub struct InMemoryLedgerStore {
    entries: RwLock<LedgerEntries>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::with_entries(LedgerEntries::new())
    }

    pub fn with_entries(entries: LedgerEntries) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn load(&self) -> Result<LedgerEntries, LedgerError> {
        let entries = self
            .entries
            .read()
            .map_err(|e| LedgerError::Serialization(e.to_string()))?;
        Ok(entries.clone())
    }

    fn save(&self, entries: &LedgerEntries) -> Result<(), LedgerError> {
        let mut stored = self
            .entries
            .write()
            .map_err(|e| LedgerError::Serialization(e.to_string()))?;
        *stored = entries.clone();
        Ok(())
    }
}
