//! Subcommand implementations

pub mod config;
pub mod doctor;
pub mod ledger;
pub mod preview;
pub mod run;
