//! CLI argument definitions

use clap::{Args, Parser, Subcommand};
use cosmos_poster_domain::ContentSource;
use std::path::PathBuf;

/// cosmos-poster: posts arXiv papers and NASA imagery to X, never the same item twice
#[derive(Parser, Debug)]
#[command(name = "cosmos-poster")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the posting loop
    Run(RunArgs),

    /// Inspect and maintain the posted-content ledger
    Ledger(LedgerArgs),

    /// Fetch and format one candidate without publishing it
    Preview(PreviewArgs),

    /// Configuration management
    Config(ConfigArgs),

    /// Validate configuration and show status
    Doctor(DoctorArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Run a single cycle and exit
    #[arg(long)]
    pub once: bool,

    /// Write posts to the outbox file instead of publishing to X
    #[arg(long)]
    pub dry_run: bool,

    /// Path to outbox file (used with --dry-run)
    #[arg(long)]
    pub outbox: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct LedgerArgs {
    #[command(subcommand)]
    pub command: LedgerCommands,
}

#[derive(Subcommand, Debug)]
pub enum LedgerCommands {
    /// List posted content ids, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Drop entries older than the retention window
    Prune {
        /// Override general.retention_days
        #[arg(long)]
        retention_days: Option<u32>,
    },

    /// Report whether a content id has already been posted
    Check {
        /// Content id, e.g. arxiv_2401.01234v1 or nasa_apod_2024-05-01
        id: String,
    },
}

#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Source to fetch from (nasa, arxiv)
    pub source: ContentSource,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Init {
        /// Path to write config file
        #[arg(long, default_value = "./config.toml")]
        path: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
