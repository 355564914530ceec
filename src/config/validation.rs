use crate::config::types::{
    Config, CrawlerConfig, NotifierConfig, PipelineConfig, StorageConfig, UserAgentConfig,
    VerifierConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_storage_config(&config.storage)?;
    validate_verifier_config(&config.verifier)?;
    validate_pipeline_config(&config.pipeline)?;
    if let Some(notifier) = &config.notifier {
        validate_notifier_config(notifier)?;
    }
    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(
            "crawler max_pages must be >= 1".to_string(),
        ));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "crawler request_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.work_dir.is_empty() {
        return Err(ConfigError::Validation(
            "work_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_verifier_config(config: &VerifierConfig) -> Result<(), ConfigError> {
    let positive = [
        ("max_urls", config.max_urls),
        ("chunk_size", config.chunk_size),
        ("max_concurrent_chunks", config.max_concurrent_chunks),
        ("in_flight_per_chunk", config.in_flight_per_chunk),
    ];
    for (name, value) in positive {
        if value < 1 {
            return Err(ConfigError::Validation(format!(
                "verifier {} must be >= 1, got {}",
                name, value
            )));
        }
    }

    if config.chunk_timeout_secs < 1 || config.overall_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "verifier timeouts must be >= 1 second".to_string(),
        ));
    }

    if config.chunk_timeout_secs > config.overall_timeout_secs {
        return Err(ConfigError::Validation(format!(
            "chunk_timeout_secs ({}) cannot exceed overall_timeout_secs ({})",
            config.chunk_timeout_secs, config.overall_timeout_secs
        )));
    }

    for pattern in &config.ignore_domains {
        validate_domain_pattern(pattern)?;
    }

    Ok(())
}

fn validate_pipeline_config(config: &PipelineConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.queue_capacity < 1 {
        return Err(ConfigError::Validation(format!(
            "pipeline workers and queue_capacity must be >= 1, got {} and {}",
            config.workers, config.queue_capacity
        )));
    }
    Ok(())
}

fn validate_notifier_config(config: &NotifierConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.callback_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid callback_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "callback_url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if config.api_key.is_empty() {
        return Err(ConfigError::Validation(
            "notifier api_key cannot be empty".to_string(),
        ));
    }

    if config.max_attempts < 1 || config.workers < 1 || config.queue_capacity < 1 {
        return Err(ConfigError::Validation(
            "notifier max_attempts, workers and queue_capacity must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates a domain pattern (supports wildcards)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    let domain = pattern.strip_prefix("*.").unwrap_or(pattern);

    if domain.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Domain pattern '{}' cannot be empty",
            pattern
        )));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
        || domain.contains("..")
    {
        return Err(ConfigError::Validation(format!(
            "Domain '{}' has a misplaced '.' or '-'",
            domain
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Domain '{}' must contain at least one dot (e.g., 'example.com')",
            domain
        )));
    }

    Ok(())
}
