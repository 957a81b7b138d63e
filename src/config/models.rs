use crate::queue::RetryPolicy;
use crate::worker::WorkerConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub worker: WorkerSettings,
    #[serde(default)]
    pub job: JobConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Artifact store client settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Store root, e.g. `https://store.example.com`. Required.
    #[serde(default)]
    pub base_url: String,
    /// Attempts per request, the first one included
    #[serde(default = "default_store_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            max_attempts: default_store_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_store_max_attempts() -> u32 {
    5
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_user_agent() -> String {
    concat!("artifact-unzip/", env!("CARGO_PKG_VERSION")).to_string()
}

/// Queue naming
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueConfig {
    #[serde(default)]
    pub prefix: String,
    #[serde(default = "default_queue_name")]
    pub name: String,
}

impl QueueConfig {
    /// `prefix` + `name`
    pub fn queue_name(&self) -> String {
        format!("{}{}", self.prefix, self.name)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            name: default_queue_name(),
        }
    }
}

fn default_queue_name() -> String {
    "unzip".to_string()
}

/// Worker pool sizing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerSettings {
    #[serde(default = "default_min_task_processors")]
    pub min_task_processors: usize,
    #[serde(default = "default_max_task_processors")]
    pub max_task_processors: usize,
    #[serde(default = "default_check_timeout_ms")]
    pub check_timeout_ms: u64,
    #[serde(default = "default_max_event_loop_delay_ms")]
    pub max_event_loop_delay_ms: u64,
}

impl WorkerSettings {
    pub fn to_worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            min_task_processors: self.min_task_processors,
            max_task_processors: self.max_task_processors,
            check_timeout: Duration::from_millis(self.check_timeout_ms),
            max_event_loop_delay: Duration::from_millis(self.max_event_loop_delay_ms),
        }
    }
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            min_task_processors: default_min_task_processors(),
            max_task_processors: default_max_task_processors(),
            check_timeout_ms: default_check_timeout_ms(),
            max_event_loop_delay_ms: default_max_event_loop_delay_ms(),
        }
    }
}

fn default_min_task_processors() -> usize {
    1
}

fn default_max_task_processors() -> usize {
    10
}

fn default_check_timeout_ms() -> u64 {
    500
}

fn default_max_event_loop_delay_ms() -> u64 {
    10
}

/// Unzip job settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct JobConfig {
    #[serde(default)]
    pub retry: JobRetryConfig,
    /// Cap on in-flight uploads per job; unset means unbounded
    #[serde(default)]
    pub max_concurrent_uploads: Option<usize>,
}

/// Job-level retry, applied by the worker pool
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobRetryConfig {
    #[serde(default = "default_job_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_job_retry_delay_ms")]
    pub delay_ms: u64,
}

impl JobRetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(self.max_attempts, Duration::from_millis(self.delay_ms))
    }
}

impl Default for JobRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_job_max_attempts(),
            delay_ms: default_job_retry_delay_ms(),
        }
    }
}

fn default_job_max_attempts() -> u32 {
    3
}

fn default_job_retry_delay_ms() -> u64 {
    5000
}

/// Control server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}
