use crate::config::sites::SiteConfig;
use crate::config::types::{Config, CrawlConfig, HttpConfig, OutputConfig, SiteEntry};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_config(&config.crawl)?;
    validate_http_config(&config.http)?;
    validate_output_config(&config.output)?;
    validate_site_entries(&config.sites)?;
    Ok(())
}

/// Validates crawl loop settings
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if !config.delay_min.is_finite() || config.delay_min < 0.0 {
        return Err(ConfigError::Validation(format!(
            "delay-min must be a non-negative number, got {}",
            config.delay_min
        )));
    }

    if !config.delay_max.is_finite() || config.delay_max < config.delay_min {
        return Err(ConfigError::Validation(format!(
            "delay-max must be >= delay-min, got {} < {}",
            config.delay_max, config.delay_min
        )));
    }

    Ok(())
}

/// Validates HTTP client settings
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if !config.timeout.is_finite() || config.timeout <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "timeout must be > 0 seconds, got {}",
            config.timeout
        )));
    }

    if config.retries < 1 {
        return Err(ConfigError::Validation(
            "retries must be >= 1".to_string(),
        ));
    }

    if !config.retry_backoff.is_finite() || config.retry_backoff < 0.0 {
        return Err(ConfigError::Validation(format!(
            "retry-backoff must be >= 0 seconds, got {}",
            config.retry_backoff
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output locations
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.db_path.is_empty() {
        return Err(ConfigError::Validation(
            "db-path cannot be empty".to_string(),
        ));
    }

    if config.log_path.is_empty() {
        return Err(ConfigError::Validation(
            "log-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates site profiles from the configuration file
fn validate_site_entries(entries: &[SiteEntry]) -> Result<(), ConfigError> {
    for (i, entry) in entries.iter().enumerate() {
        if entry.key.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "site entry {} has an empty key",
                i
            )));
        }

        let base = Url::parse(&entry.base_url).map_err(|e| {
            ConfigError::InvalidUrl(format!("base-url '{}': {}", entry.base_url, e))
        })?;
        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(format!(
                "base-url '{}' must use http or https",
                entry.base_url
            )));
        }

        for candidate in entry
            .sitemap_candidates
            .iter()
            .chain(entry.seed_category_urls.iter())
        {
            Url::parse(candidate).map_err(|e| {
                ConfigError::InvalidUrl(format!("'{}' in site '{}': {}", candidate, entry.key, e))
            })?;
        }

        // Compiling catches bad patterns and unknown parsers
        SiteConfig::from_entry(entry)?;

        if entries[..i].iter().any(|e| e.key == entry.key) {
            return Err(ConfigError::Validation(format!(
                "site '{}' is defined more than once",
                entry.key
            )));
        }
    }

    Ok(())
}
