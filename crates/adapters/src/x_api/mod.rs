//! X (Twitter) API adapters

mod publisher;

pub use publisher::{XConfig, XPublisher};
