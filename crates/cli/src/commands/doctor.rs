//! Doctor command - validate configuration and show status

use anyhow::Result;
use cosmos_poster_adapters::ledger::JsonFileLedgerStore;
use cosmos_poster_domain::LedgerStore;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::args::DoctorArgs;
use crate::config::AppConfig;

#[derive(Debug, Serialize)]
struct DoctorReport {
    config: CheckResult,
    ledger: CheckResult,
    nasa: CheckResult,
    arxiv: CheckResult,
    x: CheckResult,
    overall: Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum Status {
    Ok,
    Warn,
    Error,
}

impl Status {
    fn symbol(self) -> &'static str {
        match self {
            Status::Ok => "✓",
            Status::Warn => "⚠",
            Status::Error => "✗",
        }
    }
}

#[derive(Debug, Serialize)]
struct CheckResult {
    status: Status,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl CheckResult {
    fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: None,
        }
    }

    fn ok(message: impl Into<String>) -> Self {
        Self::new(Status::Ok, message)
    }

    fn warn(message: impl Into<String>) -> Self {
        Self::new(Status::Warn, message)
    }

    fn error(message: impl Into<String>) -> Self {
        Self::new(Status::Error, message)
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

pub async fn execute(args: DoctorArgs, config_path: Option<PathBuf>) -> Result<()> {
    let not_checked = || CheckResult::error("Not checked");
    let mut report = DoctorReport {
        config: not_checked(),
        ledger: not_checked(),
        nasa: not_checked(),
        arxiv: not_checked(),
        x: not_checked(),
        overall: Status::Error,
    };

    match AppConfig::load(config_path.as_deref()) {
        Ok(config) => {
            report.config = CheckResult::ok(format!(
                "Configuration loaded, first source: {}, poll every {}s",
                config.general.initial_source, config.general.poll_interval_secs
            ));
            report.ledger = check_ledger(&config.general.ledger_path);
            report.nasa = check_secret(&config.nasa.api_key_env, "API key")
                .with_details(serde_json::json!({
                    "base_url": config.nasa.base_url,
                    "rover": config.nasa.rover,
                }));
            report.arxiv = CheckResult::ok(format!(
                "Categories: {}",
                config.arxiv.categories.join(", ")
            ));
            report.x = check_secret(&config.x.user_token_env, "User token");
        }
        Err(e) => {
            report.config = CheckResult::error(format!("Failed to load config: {:#}", e));
        }
    }

    let checks = [
        &report.config,
        &report.ledger,
        &report.nasa,
        &report.arxiv,
        &report.x,
    ];

    report.overall = checks
        .iter()
        .map(|c| c.status)
        .max_by_key(|s| match s {
            Status::Ok => 0,
            Status::Warn => 1,
            Status::Error => 2,
        })
        .unwrap_or(Status::Error);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.overall == Status::Error {
        std::process::exit(1);
    }

    Ok(())
}

fn check_ledger(path: &Path) -> CheckResult {
    match JsonFileLedgerStore::new(path).load() {
        Ok(entries) if !path.exists() => CheckResult::ok(format!(
            "{} does not exist yet, it will be created on first post",
            path.display()
        ))
        .with_details(serde_json::json!({ "entries": entries.len() })),
        Ok(entries) => CheckResult::ok(format!(
            "{} entries in {}",
            entries.len(),
            path.display()
        ))
        .with_details(serde_json::json!({ "entries": entries.len() })),
        Err(e) => CheckResult::warn(format!(
            "{} is unreadable and will be replaced: {}",
            path.display(),
            e
        )),
    }
}

/// Required secrets are errors when absent
fn check_secret(env_var: &str, label: &str) -> CheckResult {
    if env_var.is_empty() {
        return CheckResult::error(format!("No {} env var configured", label.to_lowercase()));
    }

    match std::env::var(env_var) {
        Ok(val) if !val.trim().is_empty() => {
            CheckResult::ok(format!("{}: {} (set)", label, env_var))
        }
        _ => CheckResult::error(format!("{}: {} (not set)", label, env_var)),
    }
}

fn print_report(report: &DoctorReport) {
    println!("cosmos-poster Doctor Report");
    println!("===========================");
    println!();

    print_check("Config", &report.config);
    print_check("Ledger", &report.ledger);
    print_check("NASA", &report.nasa);
    print_check("arXiv", &report.arxiv);
    print_check("X", &report.x);

    println!();
    println!(
        "{} Overall: {}",
        report.overall.symbol(),
        format!("{:?}", report.overall).to_uppercase()
    );

    if report.overall == Status::Ok {
        println!();
        println!("Ready to run! Try: cosmos-poster run --dry-run --once");
    }
}

fn print_check(name: &str, result: &CheckResult) {
    println!("{} {}: {}", result.status.symbol(), name, result.message);
}
