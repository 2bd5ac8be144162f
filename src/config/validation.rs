use crate::config::types::{
    BudgetConfig, CampaignConfig, CheckpointConfig, Config, ProviderConfig, RetryConfig,
};
use crate::ConfigError;
use url::Url;

/// Nominatim's usage policy allows at most one request per second
const MIN_GEOCODE_PAUSE_MS: u64 = 1000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_campaign_config(&config.campaign)?;
    validate_budget_config(&config.budget)?;
    validate_retry_config(&config.retry)?;
    validate_provider_config(&config.provider)?;
    if let Some(checkpoint) = &config.checkpoint {
        validate_checkpoint_config(checkpoint)?;
    }
    Ok(())
}

/// Validates campaign paths
fn validate_campaign_config(config: &CampaignConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("locations_path", &config.locations_path),
        ("state_dir", &config.state_dir),
        ("output_dir", &config.output_dir),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }
    Ok(())
}

/// Validates the run budget
fn validate_budget_config(config: &BudgetConfig) -> Result<(), ConfigError> {
    match config.time_budget_secs {
        Some(0) => Err(ConfigError::Validation(
            "time_budget_secs must be >= 1 when set".to_string(),
        )),
        Some(_) => Ok(()),
        None if config.max_locations < 1 => Err(ConfigError::Validation(format!(
            "max_locations must be >= 1, got {}",
            config.max_locations
        ))),
        None => Ok(()),
    }
}

/// Validates the retry policy
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 || config.max_attempts > 20 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be between 1 and 20, got {}",
            config.max_attempts
        )));
    }

    if config.base_delay_ms > config.max_delay_ms {
        return Err(ConfigError::Validation(format!(
            "base_delay_ms ({}) cannot exceed max_delay_ms ({})",
            config.base_delay_ms, config.max_delay_ms
        )));
    }

    Ok(())
}

/// Validates provider endpoints and politeness settings
fn validate_provider_config(config: &ProviderConfig) -> Result<(), ConfigError> {
    validate_endpoint("geocode_url", &config.geocode_url)?;
    validate_endpoint("search_url", &config.search_url)?;

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    validate_email(&config.contact_email)?;

    if config.country_code.len() != 2 || !config.country_code.chars().all(|c| c.is_ascii_alphabetic())
    {
        return Err(ConfigError::Validation(format!(
            "country_code must be a two-letter ISO code, got '{}'",
            config.country_code
        )));
    }

    if config.geocode_pause_ms < MIN_GEOCODE_PAUSE_MS {
        return Err(ConfigError::Validation(format!(
            "geocode_pause_ms must be >= {}ms, got {}ms",
            MIN_GEOCODE_PAUSE_MS, config.geocode_pause_ms
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates checkpoint settings
fn validate_checkpoint_config(config: &CheckpointConfig) -> Result<(), ConfigError> {
    if config.database_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "checkpoint database_path cannot be empty".to_string(),
        ));
    }

    if config.every_locations.is_none() && config.every_secs.is_none() {
        return Err(ConfigError::Validation(
            "checkpoint needs every_locations or every_secs".to_string(),
        ));
    }

    if config.every_locations == Some(0) || config.every_secs == Some(0) {
        return Err(ConfigError::Validation(
            "checkpoint intervals must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates an HTTP(S) endpoint URL
fn validate_endpoint(name: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {}: {}", name, e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            name,
            url.scheme()
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
