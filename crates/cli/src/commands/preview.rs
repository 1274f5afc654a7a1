//! Preview command - fetch and format one candidate, publish nothing

use anyhow::{Context, Result, bail};
use cosmos_poster_domain::usecases::{ContentSelector, Renderer};
use serde::Serialize;
use std::path::PathBuf;

use crate::args::PreviewArgs;
use crate::commands::ledger::read_only_ledger;
use crate::commands::run::build_providers;
use crate::config::AppConfig;

#[derive(Debug, Serialize)]
struct PreviewOutput<'a> {
    source: &'a str,
    content_id: &'a str,
    chars: usize,
    max_chars: usize,
    text: &'a str,
}

pub async fn execute(args: PreviewArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let loop_config = config.run_loop_config()?;

    let providers = build_providers(&config, false)?;
    if !providers.contains_key(&args.source) {
        bail!(
            "Source {} is not available, set {} to preview it",
            args.source,
            config.nasa.api_key_env
        );
    }

    // Dedup against a copy of the ledger so the file is never rewritten here
    let ledger = read_only_ledger(&config);

    let selector = ContentSelector::new(providers, loop_config.select_config);
    let acquisition = selector.acquire(args.source, &ledger).await;

    let Some(record) = acquisition.record else {
        bail!("No unposted content found");
    };

    let rendered = Renderer::new(loop_config.render_config.clone())
        .render(&record)
        .with_context(|| format!("Failed to format {}", record.id()))?;

    let output = PreviewOutput {
        source: acquisition.source.as_str(),
        content_id: &rendered.content_id,
        chars: rendered.text.chars().count(),
        max_chars: loop_config.render_config.max_chars,
        text: &rendered.text,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Source:     {}", output.source);
        println!("Content id: {}", output.content_id);
        println!("Length:     {}/{}", output.chars, output.max_chars);
        println!();
        println!("{}", output.text);
    }

    Ok(())
}
