//! Worker pool
//!
//! An elastic set of processors, each running one job at a time off the
//! [`TaskBroker`]. A supervisor checks the pool every `check_timeout`: it adds a
//! processor while jobs are waiting and the scheduler keeps up, and removes one
//! when scheduling delay exceeds `max_event_loop_delay`. The count stays within
//! `min_task_processors..=max_task_processors`.

pub(crate) mod runner;

use crate::jobs::Job;
use crate::observability::Metrics;
use crate::queue::{FailedJobs, RetryPolicy, TaskBroker};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

/// Worker pool configuration
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub min_task_processors: usize,
    pub max_task_processors: usize,
    /// Supervisor check interval, also the idle poll interval of processors
    pub check_timeout: Duration,
    pub max_event_loop_delay: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            min_task_processors: 1,
            max_task_processors: 10,
            check_timeout: Duration::from_millis(500),
            max_event_loop_delay: Duration::from_millis(10),
        }
    }
}

/// A job together with the retry policy the pool applies to it
#[derive(Clone)]
pub struct Registration {
    pub job: Arc<dyn Job>,
    pub retry: RetryPolicy,
}

impl Registration {
    pub fn new(job: Arc<dyn Job>, retry: RetryPolicy) -> Self {
        Self { job, retry }
    }
}

/// Shared by every processor of a pool
pub(crate) struct WorkerContext {
    pub(crate) broker: Arc<TaskBroker>,
    pub(crate) registration: Registration,
    pub(crate) metrics: Arc<Metrics>,
    pub(crate) failed: Arc<FailedJobs>,
    pub(crate) poll_interval: Duration,
}

struct Processor {
    id: usize,
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScaleAction {
    Added,
    Removed,
    Unchanged,
}

pub struct WorkerPool {
    ctx: Arc<WorkerContext>,
    config: WorkerConfig,
    active: AtomicUsize,
}

impl WorkerPool {
    pub fn new(
        config: WorkerConfig,
        broker: Arc<TaskBroker>,
        registration: Registration,
        metrics: Arc<Metrics>,
        failed: Arc<FailedJobs>,
    ) -> Self {
        let ctx = WorkerContext {
            broker,
            registration,
            metrics,
            failed,
            poll_interval: config.check_timeout,
        };

        Self {
            ctx: Arc::new(ctx),
            config,
            active: AtomicUsize::new(0),
        }
    }

    /// Processors currently running
    pub fn processor_count(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    /// Supervise processors until `shutdown` becomes `true` or its sender is
    /// dropped, then wait for in-flight jobs to finish.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            queue = self.ctx.broker.queue_name(),
            job = self.ctx.registration.job.name(),
            min = self.config.min_task_processors,
            max = self.config.max_task_processors,
            "Worker pool starting"
        );

        let mut processors: Vec<Processor> = Vec::new();
        let mut retiring: Vec<JoinHandle<()>> = Vec::new();
        let mut next_id = 0;

        while processors.len() < self.config.min_task_processors {
            processors.push(self.spawn_processor(&mut next_id));
        }
        self.active.store(processors.len(), Ordering::Relaxed);

        loop {
            if *shutdown.borrow() {
                break;
            }

            let started = Instant::now();
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(self.config.check_timeout) => {}
            }
            let delay = started.elapsed().saturating_sub(self.config.check_timeout);

            processors.retain(|p| !p.handle.is_finished());
            retiring.retain(|h| !h.is_finished());

            let action = self.scale(&mut processors, &mut retiring, delay, &mut next_id);
            self.active.store(processors.len(), Ordering::Relaxed);

            debug!(
                ?action,
                delay_ms = delay.as_millis() as u64,
                processors = processors.len(),
                depth = self.ctx.broker.depth(),
                "checked for worker status"
            );
        }

        info!(processors = processors.len(), "Worker pool stopping");

        for processor in &processors {
            let _ = processor.stop.send(true);
        }
        for handle in processors.into_iter().map(|p| p.handle).chain(retiring) {
            let _ = handle.await;
        }
        self.active.store(0, Ordering::Relaxed);

        info!("Worker pool stopped");
    }

    fn scale(
        &self,
        processors: &mut Vec<Processor>,
        retiring: &mut Vec<JoinHandle<()>>,
        delay: Duration,
        next_id: &mut usize,
    ) -> ScaleAction {
        let count = processors.len();

        if count < self.config.min_task_processors {
            processors.push(self.spawn_processor(next_id));
            return ScaleAction::Added;
        }

        if delay > self.config.max_event_loop_delay {
            if count > self.config.min_task_processors {
                if let Some(processor) = processors.pop() {
                    debug!(worker_id = processor.id, "retiring worker");
                    let _ = processor.stop.send(true);
                    retiring.push(processor.handle);
                    return ScaleAction::Removed;
                }
            }
            return ScaleAction::Unchanged;
        }

        if self.ctx.broker.depth() > 0 && count < self.config.max_task_processors {
            processors.push(self.spawn_processor(next_id));
            return ScaleAction::Added;
        }

        ScaleAction::Unchanged
    }

    fn spawn_processor(&self, next_id: &mut usize) -> Processor {
        let id = *next_id;
        *next_id += 1;

        let (stop, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(runner::run_processor(id, Arc::clone(&self.ctx), stop_rx));

        Processor { id, stop, handle }
    }
}
