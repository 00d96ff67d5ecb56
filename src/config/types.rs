use serde::Deserialize;
use std::collections::BTreeMap;

/// Main configuration structure for Listing-Harvester
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub client: ClientConfig,
    #[serde(default)]
    pub filters: FiltersConfig,
    pub output: OutputConfig,
    /// Region name to marketplace location id
    #[serde(default)]
    pub regions: BTreeMap<String, u32>,
}

/// Fetch session configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Marketplace origin; index endpoints and detail URLs are resolved against it
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// User agent sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Session cookie obtained by the external login step
    #[serde(default)]
    pub cookie: Option<String>,

    /// Per-fetch timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Minimum time between two consecutive requests (milliseconds)
    #[serde(rename = "request-delay-ms", default)]
    pub request_delay_ms: u64,

    /// Extra attempts for an index page that failed to fetch or decode
    #[serde(rename = "index-retries", default = "default_index_retries")]
    pub index_retries: u32,

    /// Backoff step between index retries (milliseconds)
    #[serde(rename = "retry-backoff-ms", default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

/// Inclusion filters applied to search crawls
#[derive(Debug, Clone, Deserialize)]
pub struct FiltersConfig {
    #[serde(rename = "require-new-condition", default = "default_true")]
    pub require_new_condition: bool,

    #[serde(rename = "excluded-words", default)]
    pub excluded_words: Vec<String>,

    #[serde(rename = "excluded-sellers", default)]
    pub excluded_sellers: Vec<String>,
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            require_new_condition: true,
            excluded_words: Vec::new(),
            excluded_sellers: Vec::new(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path the JSON catalogue is written to
    #[serde(rename = "catalogue-path")]
    pub catalogue_path: String,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_index_retries() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}
