use crate::config::types::{Config, FetchConfig, ResolverConfig, ScraperConfig, SourceConfig, StoreConfig};
use crate::ConfigError;
use url::Url;

const MAX_WORKERS: u32 = 64;
const MAX_ATTEMPT_BUDGET: u32 = 10;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_source_config(&config.source)?;
    validate_fetch_config(&config.fetch)?;
    validate_scraper_config(&config.scraper)?;
    validate_store_config(&config.store)?;
    if let Some(resolver) = &config.resolver {
        validate_resolver_config(resolver)?;
    }
    Ok(())
}

/// Validates listing source configuration
fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    // The placeholder is not a valid URL character sequence on its own
    validate_http_url("listing-url", &config.listing_url.replace("{page}", "1"))?;
    validate_http_url("base-url", &config.base_url)?;

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.max_listing_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max-listing-pages must be >= 1, got {}",
            config.max_listing_pages
        )));
    }

    Ok(())
}

/// Validates HTTP request configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "connect-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.attempt_budget < 1 || config.attempt_budget > MAX_ATTEMPT_BUDGET {
        return Err(ConfigError::Validation(format!(
            "attempt-budget must be between 1 and {}, got {}",
            MAX_ATTEMPT_BUDGET, config.attempt_budget
        )));
    }

    if config.backoff_base_ms > config.backoff_max_ms {
        return Err(ConfigError::Validation(format!(
            "backoff-base-ms ({}) must not exceed backoff-max-ms ({})",
            config.backoff_base_ms, config.backoff_max_ms
        )));
    }

    Ok(())
}

/// Validates worker pool sizing
fn validate_scraper_config(config: &ScraperConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("workers", config.workers),
        ("retry-workers", config.retry_workers),
    ] {
        if value < 1 || value > MAX_WORKERS {
            return Err(ConfigError::Validation(format!(
                "{} must be between 1 and {}, got {}",
                name, MAX_WORKERS, value
            )));
        }
    }

    Ok(())
}

/// Validates store configuration
fn validate_store_config(config: &StoreConfig) -> Result<(), ConfigError> {
    if config.database_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the link resolver helper
fn validate_resolver_config(config: &ResolverConfig) -> Result<(), ConfigError> {
    match config.command.first() {
        Some(program) if !program.trim().is_empty() => {}
        _ => {
            return Err(ConfigError::Validation(
                "resolver command cannot be empty".to_string(),
            ))
        }
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "resolver timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates that a URL parses and uses HTTP or HTTPS
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    Ok(())
}
