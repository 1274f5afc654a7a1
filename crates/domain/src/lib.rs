//! cosmos-poster domain crate
//!
//! This crate contains the core domain logic following hexagonal architecture:
//! - `model`: Domain entities and value objects
//! - `ports`: Trait definitions for external dependencies (adapters)
//! - `ledger`: Posted-content ledger used for deduplication
//! - `usecases`: Content selection, rendering and the run loop

pub mod ledger;
pub mod model;
pub mod ports;
pub mod usecases;

pub use ledger::{DEFAULT_RETENTION, Ledger};
pub use model::*;
pub use ports::*;
