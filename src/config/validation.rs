use crate::config::types::{Config, CrawlerConfig, FetchConfig, PolitenessConfig};
use crate::politeness::MIN_REQUESTS_PER_HOST;
use crate::ConfigError;
use url::Url;

/// Upper bound on the worker pool size
const MAX_WORKERS: usize = 1024;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_politeness_config(&config.politeness)?;
    validate_fetch_config(&config.fetch)?;
    validate_output_path(config.output.database_path.as_deref())?;
    Ok(())
}

/// Validates crawl scope and scheduling settings
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.seeds.is_empty() {
        return Err(ConfigError::Validation(
            "at least one seed URL is required".to_string(),
        ));
    }

    for seed in &config.seeds {
        validate_seed(seed)?;
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(
            "max_pages must be >= 1, got 0".to_string(),
        ));
    }

    if config.workers < 1 || config.workers > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and {}, got {}",
            MAX_WORKERS, config.workers
        )));
    }

    if config.token_budget < 1 {
        return Err(ConfigError::Validation(
            "token_budget must be >= 1, got 0".to_string(),
        ));
    }

    if config.stats_interval_secs < 1 {
        return Err(ConfigError::Validation(
            "stats_interval_secs must be >= 1, got 0".to_string(),
        ));
    }

    // Unknown strategies are not an error: they fall back to breadth-first
    // with a warning when the engine starts.
    Ok(())
}

/// Validates a seed URL: absolute http(s) with a host
fn validate_seed(seed: &str) -> Result<(), ConfigError> {
    let url = Url::parse(seed)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Seed URL '{}' must use http or https",
            seed
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "Seed URL '{}' has no host",
            seed
        )));
    }

    Ok(())
}

/// Validates robots and rate-limit settings
fn validate_politeness_config(config: &PolitenessConfig) -> Result<(), ConfigError> {
    if !config.requests_per_host.is_finite() || config.requests_per_host <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "requests_per_host must be a positive number, got {}",
            config.requests_per_host
        )));
    }

    if config.requests_per_host < MIN_REQUESTS_PER_HOST {
        return Err(ConfigError::Validation(format!(
            "requests_per_host must be at least {} (one request per hour), got {}",
            MIN_REQUESTS_PER_HOST, config.requests_per_host
        )));
    }

    if config.robots_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "robots_timeout_secs must be >= 1, got 0".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.user_agent.chars().any(char::is_control) {
        return Err(ConfigError::Validation(format!(
            "user_agent contains control characters: {:?}",
            config.user_agent
        )));
    }

    Ok(())
}

/// Validates page fetch settings
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "fetch timeout_secs must be >= 1, got 0".to_string(),
        ));
    }

    if config.max_body_bytes < 1 {
        return Err(ConfigError::Validation(
            "max_body_bytes must be >= 1, got 0".to_string(),
        ));
    }

    Ok(())
}

fn validate_output_path(path: Option<&str>) -> Result<(), ConfigError> {
    match path {
        Some(p) if p.trim().is_empty() => Err(ConfigError::Validation(
            "database_path cannot be empty when set".to_string(),
        )),
        _ => Ok(()),
    }
}
