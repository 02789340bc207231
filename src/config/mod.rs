//! Configuration module for Gamevault
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use gamevault::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("gamevault.toml")).unwrap();
//! println!("Refresh will use {} workers", config.scraper.workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, FetchConfig, ResolverConfig, ScraperConfig, SourceConfig, StoreConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
