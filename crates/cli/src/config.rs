//! Configuration loading and management

use anyhow::{Context, Result, bail};
use cosmos_poster_adapters::sources::{ArxivConfig, NasaConfig};
use cosmos_poster_adapters::x::XConfig as XClientConfig;
use cosmos_poster_domain::ContentSource;
use cosmos_poster_domain::usecases::{RenderConfig, RunLoopConfig, SelectConfig};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use time::Date;
use time::macros::format_description;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub arxiv: ArxivSection,

    #[serde(default)]
    pub nasa: NasaSection,

    #[serde(default)]
    pub x: XSection,

    #[serde(default)]
    pub http: HttpSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_ledger_path")]
    pub ledger_path: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_error_backoff")]
    pub error_backoff_secs: u64,

    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    #[serde(default = "default_initial_source")]
    pub initial_source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArxivSection {
    #[serde(default = "default_arxiv_base_url")]
    pub base_url: String,

    #[serde(default = "default_arxiv_categories")]
    pub categories: Vec<String>,

    #[serde(default = "default_arxiv_max_results")]
    pub max_results: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NasaSection {
    #[serde(default = "default_nasa_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_nasa_base_url")]
    pub base_url: String,

    #[serde(default = "default_rover")]
    pub rover: String,

    #[serde(default = "default_apod_lookback_days")]
    pub apod_lookback_days: u32,

    #[serde(default = "default_rover_landing_date")]
    pub rover_landing_date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XSection {
    #[serde(default = "default_x_user_token_env")]
    pub user_token_env: String,

    #[serde(default = "default_x_base_url")]
    pub base_url: String,

    #[serde(default = "default_x_max_chars")]
    pub max_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSection {
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

// Default value functions
fn default_ledger_path() -> PathBuf {
    PathBuf::from("./posted_content.json")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_poll_interval() -> u64 {
    60
}

fn default_error_backoff() -> u64 {
    300
}

fn default_retry_delay() -> u64 {
    2
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retention_days() -> u32 {
    30
}

fn default_initial_source() -> String {
    "nasa".to_string()
}

fn default_arxiv_base_url() -> String {
    "http://export.arxiv.org".to_string()
}

fn default_arxiv_categories() -> Vec<String> {
    cosmos_poster_adapters::arxiv::default_categories()
}

fn default_arxiv_max_results() -> u32 {
    100
}

fn default_nasa_api_key_env() -> String {
    "NASA_API_KEY".to_string()
}

fn default_nasa_base_url() -> String {
    "https://api.nasa.gov".to_string()
}

fn default_rover() -> String {
    "curiosity".to_string()
}

fn default_apod_lookback_days() -> u32 {
    30
}

fn default_rover_landing_date() -> String {
    "2012-08-06".to_string()
}

fn default_x_user_token_env() -> String {
    "X_USER_TOKEN".to_string()
}

fn default_x_base_url() -> String {
    "https://api.twitter.com".to_string()
}

fn default_x_max_chars() -> usize {
    280
}

fn default_http_timeout() -> u64 {
    10
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            ledger_path: default_ledger_path(),
            log_level: default_log_level(),
            poll_interval_secs: default_poll_interval(),
            error_backoff_secs: default_error_backoff(),
            retry_delay_secs: default_retry_delay(),
            max_attempts: default_max_attempts(),
            retention_days: default_retention_days(),
            initial_source: default_initial_source(),
        }
    }
}

impl Default for ArxivSection {
    fn default() -> Self {
        Self {
            base_url: default_arxiv_base_url(),
            categories: default_arxiv_categories(),
            max_results: default_arxiv_max_results(),
        }
    }
}

impl Default for NasaSection {
    fn default() -> Self {
        Self {
            api_key_env: default_nasa_api_key_env(),
            base_url: default_nasa_base_url(),
            rover: default_rover(),
            apod_lookback_days: default_apod_lookback_days(),
            rover_landing_date: default_rover_landing_date(),
        }
    }
}

impl Default for XSection {
    fn default() -> Self {
        Self {
            user_token_env: default_x_user_token_env(),
            base_url: default_x_base_url(),
            max_chars: default_x_max_chars(),
        }
    }
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_timeout(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Try default config path if none specified
        let default_path = PathBuf::from("./config.toml");
        let path = config_path.unwrap_or(&default_path);

        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        } else if config_path.is_some() {
            // User specified a path that doesn't exist
            bail!("Config file not found: {}", path.display());
        }

        // Add environment variable overrides
        builder = builder.add_source(
            config::Environment::with_prefix("COSMOS_POSTER")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        let app: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        app.validate()?;
        Ok(app)
    }

    /// Reject values the bot cannot run with
    pub fn validate(&self) -> Result<()> {
        self.initial_source()?;
        self.rover_landing_date()?;

        if self.general.max_attempts == 0 {
            bail!("general.max_attempts must be at least 1");
        }
        if self.arxiv.categories.is_empty() {
            bail!("arxiv.categories must not be empty");
        }
        if self.x.max_chars < 4 {
            bail!("x.max_chars must be at least 4");
        }
        Ok(())
    }

    pub fn initial_source(&self) -> Result<ContentSource> {
        self.general
            .initial_source
            .parse()
            .map_err(|e: String| anyhow::anyhow!("general.initial_source: {}", e))
    }

    pub fn rover_landing_date(&self) -> Result<Date> {
        Date::parse(
            &self.nasa.rover_landing_date,
            format_description!("[year]-[month]-[day]"),
        )
        .with_context(|| {
            format!(
                "nasa.rover_landing_date is not a YYYY-MM-DD date: {}",
                self.nasa.rover_landing_date
            )
        })
    }

    pub fn retention(&self) -> time::Duration {
        time::Duration::days(i64::from(self.general.retention_days))
    }

    fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }

    pub fn run_loop_config(&self) -> Result<RunLoopConfig> {
        Ok(RunLoopConfig {
            poll_interval: Duration::from_secs(self.general.poll_interval_secs),
            error_backoff: Duration::from_secs(self.general.error_backoff_secs),
            initial_source: self.initial_source()?,
            select_config: SelectConfig {
                max_attempts: self.general.max_attempts,
                retry_delay: Duration::from_secs(self.general.retry_delay_secs),
            },
            render_config: RenderConfig {
                max_chars: self.x.max_chars,
                ..Default::default()
            },
        })
    }

    pub fn arxiv_config(&self) -> ArxivConfig {
        ArxivConfig {
            base_url: self.arxiv.base_url.clone(),
            categories: self.arxiv.categories.clone(),
            max_results: self.arxiv.max_results,
            timeout: self.http_timeout(),
        }
    }

    pub fn nasa_config(&self, api_key: SecretString) -> Result<NasaConfig> {
        let mut nasa = NasaConfig::new(api_key);
        nasa.base_url = self.nasa.base_url.clone();
        nasa.rover = self.nasa.rover.clone();
        nasa.apod_lookback_days = self.nasa.apod_lookback_days;
        nasa.rover_landing_date = self.rover_landing_date()?;
        nasa.timeout = self.http_timeout();
        Ok(nasa)
    }

    pub fn x_client_config(&self) -> XClientConfig {
        XClientConfig {
            base_url: self.x.base_url.clone(),
            max_chars: self.x.max_chars,
            timeout: self.http_timeout(),
        }
    }

    /// Generate example configuration as TOML string
    pub fn example_toml() -> String {
        r#"# cosmos-poster configuration
# Every value can be overridden from the environment, e.g.
#   COSMOS_POSTER__GENERAL__POLL_INTERVAL_SECS=30

[general]
ledger_path = "./posted_content.json"
log_level = "info"
poll_interval_secs = 60
# Wait after a cycle fails unexpectedly
error_backoff_secs = 300
# Pause between selector attempts that found nothing new
retry_delay_secs = 2
max_attempts = 3
# Ledger entries older than this are forgotten at startup
retention_days = 30
initial_source = "nasa"  # nasa, arxiv

[arxiv]
base_url = "http://export.arxiv.org"
categories = ["cs.CL", "cs.AI", "cs.LG", "cs.CV", "stat.ML"]
max_results = 100

[nasa]
api_key_env = "NASA_API_KEY"
base_url = "https://api.nasa.gov"
rover = "curiosity"
apod_lookback_days = 30
rover_landing_date = "2012-08-06"

[x]
user_token_env = "X_USER_TOKEN"
base_url = "https://api.twitter.com"
max_chars = 280

[http]
timeout_secs = 10
"#
        .to_string()
    }
}

/// Read a secret from the named environment variable
pub fn load_secret(env_var: &str, what: &str) -> Result<SecretString> {
    if env_var.trim().is_empty() {
        bail!("No environment variable configured for {}", what);
    }

    let value = std::env::var(env_var).with_context(|| {
        format!(
            "Missing {}: set the {} environment variable",
            what, env_var
        )
    })?;

    if value.trim().is_empty() {
        bail!("{} is set but empty ({})", env_var, what);
    }

    Ok(SecretString::new(value.into()))
}
