use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::info;

use super::JobEnvelope;
use crate::jobs::JobError;

/// Most recent permanent failures kept for inspection
const DEFAULT_CAPACITY: usize = 1000;

/// A job that exhausted its retry policy. The token is not kept.
#[derive(Debug, Clone, Serialize)]
pub struct FailedJob {
    pub seq: u64,
    pub job: String,
    pub build_id: u64,
    pub attempts: u32,
    pub error_kind: &'static str,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

impl FailedJob {
    pub fn new(job: &str, envelope: &JobEnvelope, error: &JobError) -> Self {
        Self {
            seq: envelope.seq,
            job: job.to_string(),
            build_id: envelope.payload.build_id,
            attempts: envelope.attempt,
            error_kind: error.kind(),
            error: error.to_string(),
            failed_at: Utc::now(),
        }
    }
}

/// In-memory failed-job list, oldest entries evicted first
#[derive(Debug)]
pub struct FailedJobs {
    entries: Mutex<VecDeque<FailedJob>>,
    capacity: usize,
}

impl Default for FailedJobs {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl FailedJobs {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&self, failed: FailedJob) {
        info!(seq = failed.seq, build_id = failed.build_id, attempts = failed.attempts, "Job marked as failed");

        if let Ok(mut entries) = self.entries.lock() {
            if entries.len() == self.capacity {
                entries.pop_front();
            }
            entries.push_back(failed);
        }
    }

    /// Newest first
    pub fn list(&self, limit: usize) -> Vec<FailedJob> {
        self.entries
            .lock()
            .map(|entries| entries.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
