//! Jobs run by the worker pool
//!
//! A job is registered with the pool under its [`Job::name`] together with a
//! [`RetryPolicy`](crate::queue::RetryPolicy). The job itself only reports
//! success or failure; re-running a failed job is the pool's concern.

mod unzip;

pub use unzip::UnzipJob;

use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

use crate::archive::ArchiveError;
use crate::store::StoreError;

/// Input of one job execution
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPayload {
    pub build_id: u64,
    /// Bearer credential forwarded to the store as-is
    pub token: String,
}

impl JobPayload {
    pub fn new(build_id: u64, token: impl Into<String>) -> Self {
        Self {
            build_id,
            token: token.into(),
        }
    }
}

impl fmt::Debug for JobPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobPayload")
            .field("build_id", &self.build_id)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Why a job attempt failed. Displays as the bare diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("{0}")]
    Fetch(String),

    #[error("{0}")]
    Parse(String),

    #[error("{0}")]
    Store(String),

    /// The attempt panicked; the pool turns the panic into this error
    #[error("job panicked: {0}")]
    Panicked(String),
}

impl JobError {
    pub fn kind(&self) -> &'static str {
        match self {
            JobError::Fetch(_) => "fetch",
            JobError::Parse(_) => "parse",
            JobError::Store(_) => "store",
            JobError::Panicked(_) => "panic",
        }
    }
}

impl From<StoreError> for JobError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Fetch(msg) => JobError::Fetch(msg),
            StoreError::Store(msg) => JobError::Store(msg),
        }
    }
}

impl From<ArchiveError> for JobError {
    fn from(value: ArchiveError) -> Self {
        JobError::Parse(value.to_string())
    }
}

/// Unit of work the pool can execute
#[async_trait]
pub trait Job: Send + Sync {
    /// Name the job is registered under
    fn name(&self) -> &'static str;

    /// Run one attempt. `Ok(())` signals success to the queue engine.
    async fn perform(&self, payload: &JobPayload) -> Result<(), JobError>;
}
