//! Configuration management.

mod file_config;

pub use file_config::{default_config_path, find_config_file, ConfigFileError};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::CitationStyle;
use crate::utils::RetryConfig;

/// Prefix for environment overrides, e.g. `DOI_CITE_NETWORK__TIMEOUT_SECS=30`
pub const ENV_PREFIX: &str = "DOI_CITE";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Metadata and citation services
    #[serde(default)]
    pub network: NetworkConfig,

    /// Citation generation
    #[serde(default)]
    pub citations: CitationsConfig,

    /// Collection storage
    #[serde(default)]
    pub storage: StorageConfig,

    /// Conversion cache
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP settings shared by every request the crate makes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Content-negotiation resolver; the DOI is appended verbatim
    #[serde(default = "default_doi_resolver_base")]
    pub doi_resolver_base: String,

    /// CrossRef works endpoint; the DOI is appended verbatim
    #[serde(default = "default_crossref_works_base")]
    pub crossref_works_base: String,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Attempts per request, including the first
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    #[serde(default = "default_retry_initial_delay_ms")]
    pub retry_initial_delay_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            doi_resolver_base: default_doi_resolver_base(),
            crossref_works_base: default_crossref_works_base(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            user_agent: default_user_agent(),
            retry_attempts: default_retry_attempts(),
            retry_initial_delay_ms: default_retry_initial_delay_ms(),
        }
    }
}

impl NetworkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::default()
            .max_attempts(self.retry_attempts)
            .initial_delay(Duration::from_millis(self.retry_initial_delay_ms))
    }
}

fn default_doi_resolver_base() -> String {
    "https://doi.org/".to_string()
}

fn default_crossref_works_base() -> String {
    "https://api.crossref.org/works/".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!(
        "DOI Citation Manager/{} (https://github.com/user/doi-manager)",
        env!("CARGO_PKG_VERSION")
    )
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_initial_delay_ms() -> u64 {
    500
}

/// How the per-style citation fetches of one conversion are scheduled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FanOutMode {
    #[default]
    Sequential,
    Parallel,
}

/// Citation generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationsConfig {
    #[serde(default)]
    pub fan_out: FanOutMode,

    /// Upper bound on in-flight style fetches when `fan_out = "parallel"`
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Style key shown first by front ends
    #[serde(default = "default_style")]
    pub default_style: String,
}

impl Default for CitationsConfig {
    fn default() -> Self {
        Self {
            fan_out: FanOutMode::default(),
            max_concurrency: default_max_concurrency(),
            default_style: default_style(),
        }
    }
}

impl CitationsConfig {
    /// `default_style` as a style, APA when the key is unknown
    pub fn preferred_style(&self) -> CitationStyle {
        CitationStyle::from_key(&self.default_style).unwrap_or_else(|| {
            tracing::warn!("Unknown default_style {:?}, using APA", self.default_style);
            CitationStyle::Apa
        })
    }
}

fn default_max_concurrency() -> usize {
    4
}

fn default_style() -> String {
    "APA".to_string()
}

/// Collection storage settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Rolling backups kept next to the collection file
    #[serde(default = "default_max_backups")]
    pub max_backups: usize,

    #[serde(default = "default_true")]
    pub auto_backup: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            max_backups: default_max_backups(),
            auto_backup: true,
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("DOICitationManager")
        .join("data")
}

fn default_max_backups() -> usize {
    10
}

fn default_true() -> bool {
    true
}

/// Conversion cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Defaults to the platform cache directory
    #[serde(default)]
    pub directory: Option<PathBuf>,

    #[serde(default = "default_cache_ttl")]
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            directory: None,
            ttl_seconds: default_cache_ttl(),
        }
    }
}

/// `<platform cache dir>/doi-cite`
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("doi-cite")
}

fn default_cache_ttl() -> u64 {
    30 * 24 * 60 * 60 // 30 days
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `"json"` for structured output, anything else for human-readable
    #[serde(default)]
    pub format: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn env_overrides() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// Load configuration from a file, with `DOI_CITE_*` environment overrides
pub fn load_config(path: &Path) -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(env_overrides())
        .build()?;

    settings.try_deserialize()
}

/// Get the effective configuration: the discovered config file if any,
/// otherwise defaults, with environment overrides applied either way.
pub fn get_config() -> Result<Config, config::ConfigError> {
    match find_config_file() {
        Some(path) => load_config(&path),
        None => config::Config::builder()
            .add_source(env_overrides())
            .build()?
            .try_deserialize(),
    }
}
