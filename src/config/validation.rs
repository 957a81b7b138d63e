use super::models::{Config, StoreConfig};
use crate::store::StoreClientConfig;
use reqwest::Url;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("store.base_url is required")]
    MissingStoreUrl,

    #[error("Invalid store.base_url '{url}': {reason}")]
    InvalidStoreUrl { url: String, reason: String },

    #[error("{field} must be at least 1")]
    ZeroAttempts { field: &'static str },

    #[error("Invalid worker bounds: min_task_processors = {min}, max_task_processors = {max} (need 1 <= min <= max)")]
    InvalidProcessorBounds { min: usize, max: usize },

    #[error("worker.check_timeout_ms must be positive")]
    ZeroCheckTimeout,

    #[error("job.max_concurrent_uploads must be positive when set")]
    ZeroUploadLimit,

    #[error("Queue name must not be empty")]
    EmptyQueueName,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_store(&config.store)?;
    validate_queue(config)?;
    validate_worker(config)?;
    validate_job(config)?;
    Ok(())
}

/// Parse and check the store root URL
pub fn parse_base_url(raw: &str) -> Result<Url, ValidationError> {
    if raw.trim().is_empty() {
        return Err(ValidationError::MissingStoreUrl);
    }

    let url = Url::parse(raw).map_err(|e| ValidationError::InvalidStoreUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ValidationError::InvalidStoreUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }

    if url.cannot_be_a_base() {
        return Err(ValidationError::InvalidStoreUrl {
            url: raw.to_string(),
            reason: "URL cannot be used as a base".to_string(),
        });
    }

    Ok(url)
}

impl StoreConfig {
    /// Store client settings; fails on an invalid `base_url`
    pub fn client_config(&self) -> Result<StoreClientConfig, ValidationError> {
        let mut client = StoreClientConfig::new(parse_base_url(&self.base_url)?);
        client.max_attempts = self.max_attempts;
        client.backoff_base = Duration::from_millis(self.backoff_base_ms);
        client.connect_timeout = Duration::from_secs(self.connect_timeout_secs);
        client.request_timeout = Duration::from_secs(self.request_timeout_secs);
        client.user_agent = self.user_agent.clone();
        Ok(client)
    }
}

fn validate_store(store: &StoreConfig) -> Result<(), ValidationError> {
    parse_base_url(&store.base_url)?;

    if store.max_attempts == 0 {
        return Err(ValidationError::ZeroAttempts {
            field: "store.max_attempts",
        });
    }

    Ok(())
}

fn validate_queue(config: &Config) -> Result<(), ValidationError> {
    if config.queue.queue_name().trim().is_empty() {
        return Err(ValidationError::EmptyQueueName);
    }

    Ok(())
}

fn validate_worker(config: &Config) -> Result<(), ValidationError> {
    let worker = &config.worker;

    // An idle pool keeps `min_task_processors` alive, `/health` relies on it
    if worker.min_task_processors == 0 || worker.min_task_processors > worker.max_task_processors {
        return Err(ValidationError::InvalidProcessorBounds {
            min: worker.min_task_processors,
            max: worker.max_task_processors,
        });
    }

    if worker.check_timeout_ms == 0 {
        return Err(ValidationError::ZeroCheckTimeout);
    }

    Ok(())
}

fn validate_job(config: &Config) -> Result<(), ValidationError> {
    if config.job.retry.max_attempts == 0 {
        return Err(ValidationError::ZeroAttempts {
            field: "job.retry.max_attempts",
        });
    }

    if config.job.max_concurrent_uploads == Some(0) {
        return Err(ValidationError::ZeroUploadLimit);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> Config {
        let mut config = Config::default();
        config.store.base_url = "https://test-store.screwdriver.cd".to_string();
        config
    }

    #[test]
    fn test_valid_config() {
        let config = create_test_config();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_missing_store_url() {
        let config = Config::default();

        let result = validate(&config);
        assert!(matches!(result, Err(ValidationError::MissingStoreUrl)));
    }

    #[test]
    fn test_invalid_store_scheme() {
        let mut config = create_test_config();
        config.store.base_url = "ftp://store".to_string();

        let result = validate(&config);
        assert!(matches!(result, Err(ValidationError::InvalidStoreUrl { .. })));
    }

    #[test]
    fn test_unparseable_store_url() {
        let mut config = create_test_config();
        config.store.base_url = "not a url".to_string();

        let result = validate(&config);
        assert!(matches!(result, Err(ValidationError::InvalidStoreUrl { .. })));
    }

    #[test]
    fn test_zero_store_attempts() {
        let mut config = create_test_config();
        config.store.max_attempts = 0;

        let result = validate(&config);
        assert!(matches!(
            result,
            Err(ValidationError::ZeroAttempts { field: "store.max_attempts" })
        ));
    }

    #[test]
    fn test_min_above_max_processors() {
        let mut config = create_test_config();
        config.worker.min_task_processors = 5;
        config.worker.max_task_processors = 2;

        let result = validate(&config);
        assert!(matches!(
            result,
            Err(ValidationError::InvalidProcessorBounds { min: 5, max: 2 })
        ));
    }

    #[test]
    fn test_zero_min_processors() {
        let mut config = create_test_config();
        config.worker.min_task_processors = 0;

        let result = validate(&config);
        assert!(matches!(
            result,
            Err(ValidationError::InvalidProcessorBounds { min: 0, max: 10 })
        ));
    }

    #[test]
    fn test_zero_job_attempts() {
        let mut config = create_test_config();
        config.job.retry.max_attempts = 0;

        let result = validate(&config);
        assert!(matches!(
            result,
            Err(ValidationError::ZeroAttempts { field: "job.retry.max_attempts" })
        ));
    }

    #[test]
    fn test_zero_upload_limit() {
        let mut config = create_test_config();
        config.job.max_concurrent_uploads = Some(0);

        let result = validate(&config);
        assert!(matches!(result, Err(ValidationError::ZeroUploadLimit)));
    }

    #[test]
    fn test_client_config_from_store_section() {
        let mut config = create_test_config();
        config.store.max_attempts = 2;
        config.store.backoff_base_ms = 50;

        let client = config.store.client_config().unwrap();
        assert_eq!(client.base_url.as_str(), "https://test-store.screwdriver.cd/");
        assert_eq!(client.max_attempts, 2);
        assert_eq!(client.backoff_base, Duration::from_millis(50));
    }
}
