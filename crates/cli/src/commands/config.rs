//! Config command - configuration management

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::Path;

use crate::args::{ConfigArgs, ConfigCommands};
use crate::config::AppConfig;

pub async fn execute(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Init { path, force } => init_config(&path, force),
    }
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, AppConfig::example_toml())
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;

    let defaults = AppConfig::default();
    println!("Created config file: {}", path.display());
    println!();
    println!("Next steps:");
    println!(
        "  1. Export {} and {} (a .env file works too)",
        defaults.nasa.api_key_env, defaults.x.user_token_env
    );
    println!("  2. Run 'cosmos-poster doctor' to validate your setup");
    println!("  3. Run 'cosmos-poster preview arxiv' to see a formatted post");
    println!("  4. Run 'cosmos-poster run --dry-run --once' to test a full cycle");

    Ok(())
}
