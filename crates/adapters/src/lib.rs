//! cosmos-poster adapters crate
//!
//! This crate contains infrastructure adapters implementing the domain ports:
//! - `sources`: arXiv and NASA content providers
//! - `ledger`: JSON file and in-memory ledger stores
//! - `x`: X (Twitter) API publisher
//! - `outbox`: JSONL outbox publisher for dry runs

mod ledger_json;
mod ledger_memory;
mod text;

pub mod arxiv;
pub mod nasa;
pub mod outbox;
pub mod x_api;

/// Re-exports for content sources
pub mod sources {
    pub use crate::arxiv::{ArxivConfig, ArxivSource};
    pub use crate::nasa::{NasaConfig, NasaSource};
}

/// Re-exports for ledger stores
pub mod ledger {
    pub use crate::ledger_json::JsonFileLedgerStore;
    pub use crate::ledger_memory::InMemoryLedgerStore;
}

/// Re-exports for X API adapters
pub mod x {
    pub use crate::x_api::{XConfig, XPublisher};
}
