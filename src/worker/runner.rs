//! Processor loop - takes jobs off the broker and applies the retry policy

use super::WorkerContext;
use crate::jobs::JobError;
use crate::queue::{FailedJob, JobEnvelope};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// Run jobs one at a time until `stop` flips to `true` or its sender is
/// dropped. A job in progress is always finished first.
pub(crate) async fn run_processor(
    worker_id: usize,
    ctx: Arc<WorkerContext>,
    mut stop: watch::Receiver<bool>,
) {
    let queue = ctx.broker.queue_name();
    info!(worker_id, queue, "worker started");

    loop {
        if *stop.borrow() {
            break;
        }

        match ctx.broker.pop() {
            Some(envelope) => process_job(worker_id, &ctx, envelope).await,
            None => {
                debug!(worker_id, queue, "polling");
                tokio::select! {
                    _ = ctx.broker.notified() => {}
                    _ = tokio::time::sleep(ctx.poll_interval) => {}
                    changed = stop.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    }

    info!(worker_id, queue, "worker ended");
}

/// Perform one attempt and decide between success, re-enqueue and failure
pub(crate) async fn process_job(worker_id: usize, ctx: &WorkerContext, envelope: JobEnvelope) {
    let job = &ctx.registration.job;
    let name = job.name();
    let queue = ctx.broker.queue_name();
    let seq = envelope.seq;
    let build_id = envelope.payload.build_id;
    let attempt = envelope.attempt;

    info!(worker_id, queue, job = name, seq, build_id, attempt, "working job");
    ctx.metrics.job_started();

    let outcome = AssertUnwindSafe(job.perform(&envelope.payload))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(JobError::Panicked(panic_message(panic.as_ref()))));

    match outcome {
        Ok(()) => {
            ctx.metrics.job_succeeded();
            info!(worker_id, queue, job = name, seq, build_id, attempt, "job success");
        }
        Err(e) => {
            let retry = ctx.registration.retry;

            if retry.should_retry(attempt) {
                ctx.metrics.job_re_enqueued();
                info!(
                    worker_id,
                    queue,
                    job = name,
                    seq,
                    build_id,
                    attempt,
                    delay_ms = retry.delay.as_millis() as u64,
                    error = %e,
                    "reEnqueue job"
                );
                ctx.broker.schedule_retry(envelope.next_attempt(), retry.delay);
            } else {
                ctx.metrics.job_failed();
                error!(
                    worker_id,
                    queue,
                    job = name,
                    seq,
                    build_id,
                    attempt,
                    kind = e.kind(),
                    error = %e,
                    "job failure"
                );
                ctx.failed.record(FailedJob::new(name, &envelope, &e));
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
