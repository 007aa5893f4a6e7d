//! Application configuration for docscout.
//!
//! User config lives at `~/.docscout/docscout.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScraperError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "docscout.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".docscout";

// ---------------------------------------------------------------------------
// Config structs (matching docscout.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Crawl budgets and HTTP behaviour.
    #[serde(default)]
    pub scraper: ScraperConfig,

    /// GitHub endpoints and token lookup.
    #[serde(default)]
    pub github: GitHubConfig,
}

/// `[scraper]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Default page budget per job.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Default maximum link depth from the seed URL.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Number of sibling queue items fetched concurrently.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_page_timeout_ms")]
    pub page_timeout_ms: u64,

    /// Retries for transient HTTP failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay for exponential retry backoff.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// User-Agent header sent with every HTTP request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            max_depth: default_max_depth(),
            max_concurrency: default_max_concurrency(),
            page_timeout_ms: default_page_timeout_ms(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_max_pages() -> usize {
    1000
}
fn default_max_depth() -> usize {
    3
}
fn default_max_concurrency() -> usize {
    3
}
fn default_page_timeout_ms() -> u64 {
    30_000
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_base_delay_ms() -> u64 {
    1000
}
fn default_user_agent() -> String {
    concat!("docscout/", env!("CARGO_PKG_VERSION")).into()
}

/// `[github]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// REST API base URL.
    #[serde(default = "default_github_api_url")]
    pub api_url: String,

    /// Raw file content base URL.
    #[serde(default = "default_github_raw_url")]
    pub raw_url: String,

    /// Env vars consulted (in order) for a token when no Authorization header is given.
    #[serde(default = "default_token_env")]
    pub token_env: Vec<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_github_api_url(),
            raw_url: default_github_raw_url(),
            token_env: default_token_env(),
        }
    }
}

fn default_github_api_url() -> String {
    "https://api.github.com".into()
}
fn default_github_raw_url() -> String {
    "https://raw.githubusercontent.com".into()
}
fn default_token_env() -> Vec<String> {
    vec!["GITHUB_TOKEN".into(), "GH_TOKEN".into()]
}

impl GitHubConfig {
    /// First non-empty token found in the configured env vars.
    pub fn token_from_env(&self) -> Option<String> {
        self.token_env
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|val| !val.trim().is_empty())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.docscout/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ScraperError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.docscout/docscout.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ScraperError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        ScraperError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ScraperError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ScraperError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ScraperError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

impl AppConfig {
    /// Reject values the crawl engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.scraper.max_concurrency == 0 {
            return Err(ScraperError::config("scraper.max_concurrency must be at least 1"));
        }
        for (key, value) in [
            ("github.api_url", &self.github.api_url),
            ("github.raw_url", &self.github.raw_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| ScraperError::config(format!("{key} is not a valid URL: {e}")))?;
        }
        Ok(())
    }
}
