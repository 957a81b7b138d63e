use std::sync::Arc;

use artifact_unzip::api::{self, AppState};
use artifact_unzip::config::Config;
use artifact_unzip::jobs::{Job, JobPayload, UnzipJob};
use artifact_unzip::observability::Metrics;
use artifact_unzip::queue::{FailedJobs, TaskBroker};
use artifact_unzip::store::{ArtifactStore, HttpStore};
use artifact_unzip::worker::{Registration, WorkerPool};
use tokio::sync::watch;
use tracing::info;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

fn build_job(config: &Config) -> Result<UnzipJob, AnyError> {
    let client_config = config.store.client_config()?;
    info!(store = %client_config.base_url, max_attempts = client_config.max_attempts, "Artifact store client ready");

    let store: Arc<dyn ArtifactStore> = Arc::new(HttpStore::new(client_config)?);
    Ok(UnzipJob::new(store).with_upload_limit(config.job.max_concurrent_uploads))
}

/// Run the worker pool and the control API until a shutdown signal arrives
pub async fn run(config: Config) -> Result<(), AnyError> {
    let job = build_job(&config)?;
    let registration = Registration::new(Arc::new(job), config.job.retry.policy());

    let broker = Arc::new(TaskBroker::new(config.queue.queue_name()));
    let metrics = Arc::new(Metrics::new());
    let failed = Arc::new(FailedJobs::default());
    let pool = Arc::new(WorkerPool::new(
        config.worker.to_worker_config(),
        broker.clone(),
        registration,
        metrics.clone(),
        failed.clone(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let pool_task = {
        let pool = pool.clone();
        tokio::spawn(async move { pool.run(shutdown_rx).await })
    };

    let state = AppState::new(broker, pool, metrics, failed);
    let served = api::serve(config.server.bind_addr, state, api::shutdown_signal()).await;

    // Stop the pool even if the API failed to start
    let _ = shutdown_tx.send(true);
    pool_task.await?;

    served
}

/// Perform a single unzip job without the pool or its retry policy
pub async fn unzip_once(config: Config, build_id: u64, token: String) -> Result<(), AnyError> {
    let job = build_job(&config)?;
    job.perform(&JobPayload::new(build_id, token)).await?;
    Ok(())
}
