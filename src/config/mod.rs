//! Configuration management for the unzip worker
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use artifact_unzip::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Store: {}", config.store.base_url);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `UNZIP__<section>__<key>`
//!
//! Examples:
//! - `UNZIP__STORE__BASE_URL=https://store.example.com`
//! - `UNZIP__WORKER__MAX_TASK_PROCESSORS=20`
//! - `UNZIP__JOB__MAX_CONCURRENT_UPLOADS=32`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/unzip.toml`.
//! This can be overridden using the `UNZIP_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use models::{
    Config, JobConfig, JobRetryConfig, QueueConfig, ServerConfig, StoreConfig, WorkerSettings,
};
pub use validation::{ValidationError, parse_base_url};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables (`UNZIP__*`)
    /// 2. TOML file (default: `config/unzip.toml`)
    /// 3. Default values
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file is malformed
    /// - Validation fails (missing store URL, bad worker bounds, etc.)
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}
