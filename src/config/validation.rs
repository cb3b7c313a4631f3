use crate::config::types::{Config, CrawlerConfig, FetchConfig, OutputConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_fetch_config(&config.fetch)?;
    validate_output_config(&config.output)?;
    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    let seed = Url::parse(&config.seed_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed-url: {}", e)))?;

    if seed.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "seed-url has no host: {}",
            config.seed_url
        )));
    }

    if config.fetch_workers < 1 {
        return Err(ConfigError::Validation(format!(
            "fetch-workers must be >= 1, got {}",
            config.fetch_workers
        )));
    }

    if config.parse_workers < 1 {
        return Err(ConfigError::Validation(format!(
            "parse-workers must be >= 1, got {}",
            config.parse_workers
        )));
    }

    if config.save_interval_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "save-interval-secs must be >= 1, got {}",
            config.save_interval_secs
        )));
    }

    if config.idle_threshold_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "idle-threshold-secs must be >= 1, got {}",
            config.idle_threshold_secs
        )));
    }

    Ok(())
}

fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.user_agents.is_empty() {
        return Err(ConfigError::Validation(
            "user-agents must contain at least one entry".to_string(),
        ));
    }

    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    if config.backoff_base_secs > config.backoff_cap_secs {
        return Err(ConfigError::Validation(format!(
            "backoff-base-secs ({}) must not exceed backoff-cap-secs ({})",
            config.backoff_base_secs, config.backoff_cap_secs
        )));
    }

    if config.pacing_min_ms > config.pacing_max_ms {
        return Err(ConfigError::Validation(format!(
            "pacing-min-ms ({}) must not exceed pacing-max-ms ({})",
            config.pacing_min_ms, config.pacing_max_ms
        )));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.records_path.is_empty() {
        return Err(ConfigError::Validation(
            "records-path cannot be empty".to_string(),
        ));
    }

    if config.checkpoint_path.is_empty() {
        return Err(ConfigError::Validation(
            "checkpoint-path cannot be empty".to_string(),
        ));
    }

    if config.links_log_path.is_empty() {
        return Err(ConfigError::Validation(
            "links-log-path cannot be empty".to_string(),
        ));
    }

    if config.rotate_bytes == 0 {
        return Err(ConfigError::Validation(
            "rotate-bytes must be > 0".to_string(),
        ));
    }

    Ok(())
}
