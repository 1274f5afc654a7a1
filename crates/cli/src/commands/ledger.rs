//! Ledger command - inspect and maintain the posted-content ledger

use anyhow::Result;
use cosmos_poster_adapters::ledger::{InMemoryLedgerStore, JsonFileLedgerStore};
use cosmos_poster_domain::{Ledger, LedgerStore, SystemClock};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;

use crate::args::{LedgerArgs, LedgerCommands};
use crate::config::AppConfig;

#[derive(Debug, Serialize)]
struct EntryOutput<'a> {
    content_id: &'a str,
    posted_at: String,
}

pub async fn execute(args: LedgerArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    match args.command {
        LedgerCommands::List { json } => list(&config, json),
        LedgerCommands::Prune { retention_days } => prune(&config, retention_days),
        LedgerCommands::Check { id } => check(&config, &id),
    }
}

/// Ledger view that never writes back to the file
pub(crate) fn read_only_ledger(config: &AppConfig) -> Ledger {
    let entries = JsonFileLedgerStore::new(&config.general.ledger_path)
        .load()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Could not read ledger, treating it as empty");
            Default::default()
        });

    Ledger::open(
        Arc::new(InMemoryLedgerStore::with_entries(entries)),
        Arc::new(SystemClock),
        config.retention(),
    )
}

fn list(config: &AppConfig, json: bool) -> Result<()> {
    let ledger = read_only_ledger(config);

    let entries = ledger
        .entries()
        .into_iter()
        .map(|(content_id, entry)| -> Result<EntryOutput> {
            Ok(EntryOutput {
                content_id,
                posted_at: entry.posted_at.format(&Rfc3339)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("Ledger is empty: {}", config.general.ledger_path.display());
        return Ok(());
    }

    println!("{} posted item(s):", entries.len());
    for entry in &entries {
        println!("  {}  {}", entry.posted_at, entry.content_id);
    }

    Ok(())
}

fn prune(config: &AppConfig, retention_days: Option<u32>) -> Result<()> {
    let days = retention_days.unwrap_or(config.general.retention_days);
    let store = Arc::new(JsonFileLedgerStore::new(&config.general.ledger_path));
    let before = store.load().map(|entries| entries.len()).unwrap_or(0);

    // Opening prunes and persists
    let ledger = Ledger::open(
        store,
        Arc::new(SystemClock),
        time::Duration::days(i64::from(days)),
    );
    let removed = before.saturating_sub(ledger.len());

    println!(
        "Pruned {} item(s) older than {} days, {} remaining",
        removed,
        days,
        ledger.len()
    );

    Ok(())
}

fn check(config: &AppConfig, id: &str) -> Result<()> {
    let ledger = read_only_ledger(config);

    match ledger.get(id) {
        Some(entry) => {
            println!("{} was posted at {}", id, entry.posted_at.format(&Rfc3339)?);
        }
        None => {
            println!("{} has not been posted", id);
        }
    }

    Ok(())
}
