//! Gamevault: a local catalogue of games scraped from a listing site
//!
//! This crate walks a paginated game listing, fetches and parses each game page
//! under a bounded worker pool, persists the results in a local SQLite store,
//! tracks and retries failures, and detects new or updated entries on later runs.

pub mod config;
pub mod crawler;
pub mod diff;
pub mod model;
pub mod output;
pub mod resolver;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Gamevault operations
///
/// Per-item fetch and parse failures never show up here; they are recorded in the
/// failed set and the run carries on. Only run-level failures propagate.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Listing crawl stopped after {pages_fetched} page(s): {source}")]
    ListingIncomplete {
        pages_fetched: u32,
        source: crawler::FetchError,
        summary: Box<output::RunSummary>,
    },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Game not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("URL has no path segment to derive an identifier from: {0}")]
    MissingSlug(String),
}

/// Result type alias for Gamevault operations
pub type Result<T> = std::result::Result<T, VaultError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use model::{Candidate, CandidateSet, DownloadLink, GameRecord};
pub use state::{ChangeKind, FailureKind};
pub use storage::{SqliteStore, Store};
