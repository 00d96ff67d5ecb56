use crate::config::types::{ClientConfig, Config, FiltersConfig, OutputConfig};
use crate::ConfigError;
use std::collections::BTreeMap;
use url::Url;

/// Upper bound for the configured waits between requests
const MAX_WAIT_MS: u64 = 60_000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_client_config(&config.client)?;
    validate_filters_config(&config.filters)?;
    validate_output_config(&config.output)?;
    validate_regions(&config.regions)?;
    Ok(())
}

/// Validates fetch session configuration
fn validate_client_config(config: &ClientConfig) -> Result<(), ConfigError> {
    let base = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if base.scheme() != "https" && base.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    if base.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' has no host",
            config.base_url
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs < 1 || config.timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "timeout-secs must be between 1 and 300, got {}",
            config.timeout_secs
        )));
    }

    if let Some(cookie) = &config.cookie {
        if cookie.trim().is_empty() || cookie.contains('\n') {
            return Err(ConfigError::Validation(
                "cookie must be a non-empty single line".to_string(),
            ));
        }
    }

    if config.index_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "index-retries must be <= 10, got {}",
            config.index_retries
        )));
    }

    if config.retry_backoff_ms > MAX_WAIT_MS {
        return Err(ConfigError::Validation(format!(
            "retry-backoff-ms must be <= {}, got {}",
            MAX_WAIT_MS, config.retry_backoff_ms
        )));
    }

    if config.request_delay_ms > MAX_WAIT_MS {
        return Err(ConfigError::Validation(format!(
            "request-delay-ms must be <= {}, got {}",
            MAX_WAIT_MS, config.request_delay_ms
        )));
    }

    Ok(())
}

/// Validates filter lists
fn validate_filters_config(config: &FiltersConfig) -> Result<(), ConfigError> {
    if config.excluded_words.iter().any(|w| w.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "excluded-words cannot contain blank entries".to_string(),
        ));
    }

    if config.excluded_sellers.iter().any(|s| s.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "excluded-sellers cannot contain blank entries".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    if config.catalogue_path.is_empty() {
        return Err(ConfigError::Validation(
            "catalogue-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the region table
fn validate_regions(regions: &BTreeMap<String, u32>) -> Result<(), ConfigError> {
    if let Some(name) = regions.keys().find(|name| name.trim().is_empty()) {
        return Err(ConfigError::Validation(format!(
            "region name '{}' cannot be blank",
            name
        )));
    }
    Ok(())
}
