use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "UNZIP_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/unzip.toml";
const ENV_PREFIX: &str = "UNZIP";
const ENV_SEPARATOR: &str = "__";

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables (highest priority)
pub fn load() -> Result<Config, ConfigError> {
    // Missing .env is fine
    let _ = dotenvy::dotenv();

    let config_path = env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    load_from_sources(config_path)
}

/// Load configuration from a specific path and environment
/// Useful for testing with custom config files
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::warn!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // UNZIP__STORE__BASE_URL -> store.base_url
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    let config = builder.build()?;
    config.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_defaults_only() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.server.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.job.retry.max_attempts, 3);
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[store]
base_url = "https://test-store.screwdriver.cd"
max_attempts = 4

[worker]
min_task_processors = 2
max_task_processors = 6
check_timeout_ms = 1000
max_event_loop_delay_ms = 25

[job.retry]
max_attempts = 5
delay_ms = 100

[server]
bind_addr = "127.0.0.1:9000"
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.store.base_url, "https://test-store.screwdriver.cd");
        assert_eq!(config.store.max_attempts, 4);
        assert_eq!(config.worker.min_task_processors, 2);
        assert_eq!(config.worker.max_task_processors, 6);
        assert_eq!(config.worker.max_event_loop_delay_ms, 25);
        assert_eq!(config.job.retry.max_attempts, 5);
        assert_eq!(config.job.retry.delay_ms, 100);
        assert_eq!(config.server.bind_addr.to_string(), "127.0.0.1:9000");
    }

    // Environment overrides are not exercised here: env::set_var is unsafe
    // under edition 2024 and tests run in parallel.
}
