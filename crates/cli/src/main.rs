//! cosmos-poster CLI entry point

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod args;
mod commands;
mod config;

use args::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; variables may come from the real environment
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let log_level = cli
        .log_level
        .clone()
        .or_else(|| configured_log_level(cli.config.as_deref()))
        .unwrap_or_else(|| "info".to_string());
    init_logging(&log_level, cli.log_json)?;

    match cli.command {
        Commands::Run(args) => commands::run::execute(args, cli.config).await,
        Commands::Ledger(args) => commands::ledger::execute(args, cli.config).await,
        Commands::Preview(args) => commands::preview::execute(args, cli.config).await,
        Commands::Config(args) => commands::config::execute(args).await,
        Commands::Doctor(args) => commands::doctor::execute(args, cli.config).await,
    }
}

/// Log level from the config file, if one loads cleanly
fn configured_log_level(path: Option<&std::path::Path>) -> Option<String> {
    crate::config::AppConfig::load(path)
        .ok()
        .map(|c| c.general.log_level)
}

fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}
