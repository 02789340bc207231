use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Gamevault
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub scraper: ScraperConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub resolver: Option<ResolverConfig>,
}

/// Where the game listing lives
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Listing page URL; `{page}` is replaced by the 1-based page number
    ///
    /// Without a `{page}` placeholder the listing is a single page.
    #[serde(rename = "listing-url", default = "default_listing_url")]
    pub listing_url: String,

    /// Base URL relative listing links are resolved against
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Upper bound on listing pages walked in one crawl
    #[serde(rename = "max-listing-pages", default = "default_max_listing_pages")]
    pub max_listing_pages: u32,
}

/// HTTP request behavior
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Hard per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connect timeout (seconds)
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Attempts per URL before a failure becomes terminal
    #[serde(rename = "attempt-budget", default = "default_attempt_budget")]
    pub attempt_budget: u32,

    /// Delay before the first retry (milliseconds); doubles on each retry
    #[serde(rename = "backoff-base-ms", default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Upper bound on a single retry delay (milliseconds)
    #[serde(rename = "backoff-max-ms", default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
}

/// Worker pool sizing
#[derive(Debug, Clone, Deserialize)]
pub struct ScraperConfig {
    /// Concurrent page scrapes during a refresh
    #[serde(default = "default_workers")]
    pub workers: u32,

    /// Concurrent page scrapes during a targeted retry
    #[serde(rename = "retry-workers", default = "default_retry_workers")]
    pub retry_workers: u32,
}

/// Local store location
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// External direct-link extraction helper
#[derive(Debug, Clone, Deserialize)]
pub struct ResolverConfig {
    /// Program and leading arguments; the page URL is appended as the last argument
    pub command: Vec<String>,

    /// Hard limit for one extraction (seconds)
    #[serde(rename = "timeout-secs", default = "default_resolver_timeout_secs")]
    pub timeout_secs: u64,
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl ResolverConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            listing_url: default_listing_url(),
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            max_listing_pages: default_max_listing_pages(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            attempt_budget: default_attempt_budget(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
        }
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            retry_workers: default_retry_workers(),
        }
    }
}

fn default_listing_url() -> String {
    "https://steamrip.com/games-list-page/".to_string()
}

fn default_base_url() -> String {
    "https://steamrip.com".to_string()
}

fn default_user_agent() -> String {
    concat!("gamevault/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_max_listing_pages() -> u32 {
    50
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_attempt_budget() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    500
}

fn default_backoff_max_ms() -> u64 {
    8_000
}

// Eight parallel page fetches keeps a full refresh of a few thousand games in
// the minutes range without hammering the listing site.
fn default_workers() -> u32 {
    8
}

fn default_retry_workers() -> u32 {
    2
}

fn default_resolver_timeout_secs() -> u64 {
    120
}
