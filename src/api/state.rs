use std::sync::Arc;

use crate::observability::Metrics;
use crate::queue::{FailedJobs, TaskBroker};
use crate::worker::WorkerPool;

#[derive(Clone)]
pub struct AppState {
    pub broker: Arc<TaskBroker>,
    pub pool: Arc<WorkerPool>,
    pub metrics: Arc<Metrics>,
    pub failed: Arc<FailedJobs>,
}

impl AppState {
    pub fn new(
        broker: Arc<TaskBroker>,
        pool: Arc<WorkerPool>,
        metrics: Arc<Metrics>,
        failed: Arc<FailedJobs>,
    ) -> Self {
        Self {
            broker,
            pool,
            metrics,
            failed,
        }
    }
}
