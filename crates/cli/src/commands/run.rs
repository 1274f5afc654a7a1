//! Run command - acquire, format, publish and record loop

use anyhow::{Context, Result};
use cosmos_poster_adapters::{
    ledger::JsonFileLedgerStore,
    outbox::{OutboxPublisher, OutboxWriter},
    sources::{ArxivSource, NasaSource},
    x::XPublisher,
};
use cosmos_poster_domain::{
    ContentSource, CycleOutcome, Ledger, Publisher, SystemClock,
    usecases::{ContentSelector, Providers, RunLoop},
};
use std::path::PathBuf;
use std::sync::Arc;

use crate::args::RunArgs;
use crate::config::{AppConfig, load_secret};

pub async fn execute(args: RunArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    let outbox_path = if args.dry_run {
        Some(args.outbox.clone().unwrap_or_else(default_outbox_path))
    } else {
        None
    };

    if args.outbox.is_some() && !args.dry_run {
        tracing::warn!("--outbox is ignored without --dry-run");
    }

    let loop_config = config.run_loop_config()?;

    tracing::info!(
        dry_run = args.dry_run,
        once = args.once,
        outbox = ?outbox_path,
        ledger = %config.general.ledger_path.display(),
        initial_source = %loop_config.initial_source,
        "Starting cosmos-poster run"
    );

    // Build dependencies
    let providers = build_providers(&config, true)?;

    let publisher: Arc<dyn Publisher> = match outbox_path {
        Some(path) => {
            let writer = OutboxWriter::open(path.clone())
                .await
                .context("Failed to initialize outbox writer")?;
            tracing::info!(outbox = %path.display(), "Dry run, writing posts to outbox");
            Arc::new(OutboxPublisher::new(writer, "x"))
        }
        None => Arc::new(build_x_publisher(&config)?),
    };

    let ledger = open_ledger(&config);
    tracing::info!(entries = ledger.len(), "Ledger loaded");

    let selector = ContentSelector::new(providers, loop_config.select_config.clone());
    let mut run_loop = RunLoop::new(selector, publisher.clone(), ledger, loop_config);

    if args.once {
        tracing::info!("Running single cycle");
        let outcome = run_loop.run_cycle().await;
        publisher.close().await;
        report_outcome(&outcome.context("Cycle failed")?);
    } else {
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutdown signal received");
        };

        run_loop.run(shutdown).await;
    }

    tracing::info!("cosmos-poster run completed");
    Ok(())
}

/// Build the content providers; the NASA key is only optional for previews
pub(crate) fn build_providers(config: &AppConfig, nasa_required: bool) -> Result<Providers> {
    let mut providers = Providers::new();

    let arxiv = ArxivSource::new(config.arxiv_config()).context("Failed to create arXiv source")?;
    providers.insert(ContentSource::Arxiv, Arc::new(arxiv));

    match load_secret(&config.nasa.api_key_env, "NASA API key") {
        Ok(api_key) => {
            let nasa = NasaSource::new(config.nasa_config(api_key)?)
                .context("Failed to create NASA source")?;
            providers.insert(ContentSource::Nasa, Arc::new(nasa));
        }
        Err(e) if nasa_required => return Err(e),
        Err(e) => tracing::debug!(error = %e, "NASA source unavailable"),
    }

    Ok(providers)
}

fn build_x_publisher(config: &AppConfig) -> Result<XPublisher> {
    let user_token = load_secret(&config.x.user_token_env, "X user token")?;
    XPublisher::new(user_token, config.x_client_config()).context("Failed to create X publisher")
}

pub(crate) fn open_ledger(config: &AppConfig) -> Ledger {
    let store = Arc::new(JsonFileLedgerStore::new(&config.general.ledger_path));
    Ledger::open(store, Arc::new(SystemClock), config.retention())
}

fn report_outcome(outcome: &CycleOutcome) {
    match outcome {
        CycleOutcome::Published {
            content_id,
            source,
            post_id,
        } => {
            tracing::info!(content_id = %content_id, source = %source, post_id = %post_id, "Published");
        }
        CycleOutcome::NoContent => {
            tracing::warn!("No unposted content found");
        }
        CycleOutcome::FormatFailed { content_id, error } => {
            tracing::error!(content_id = %content_id, error = %error, "Skipped, formatting failed");
        }
        CycleOutcome::PublishFailed { content_id, error } => {
            tracing::error!(content_id = %content_id, error = %error, "Publish failed");
        }
    }
}

fn default_outbox_path() -> PathBuf {
    PathBuf::from("./outbox.jsonl")
}
