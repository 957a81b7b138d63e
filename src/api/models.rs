//! Control API models
//!
//! - `POST /jobs/unzip` accepts a [`JobPayload`](crate::jobs::JobPayload)
//!   (`{"buildId": 1234, "token": "..."}`) and answers [`JobAcceptedResponse`]
//! - `GET /status` returns [`StatusResponse`]
//! - `GET /health` returns [`HealthResponse`]

use serde::Serialize;
use std::collections::BTreeMap;

use crate::observability::MetricsSnapshot;
use crate::queue::FailedJob;

#[derive(Debug, Serialize)]
pub struct JobAcceptedResponse {
    pub seq: u64,
    pub queue: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub queue: String,
    pub depth: usize,
    pub processors: usize,
    pub metrics: MetricsSnapshot,
    pub failed: Vec<FailedJob>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: BTreeMap<String, String>,
    pub version: String,
}
