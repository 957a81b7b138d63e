use crate::jobs::JobPayload;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

/// Queued job with its sequence number and 1-based attempt counter
#[derive(Clone, Debug)]
pub struct JobEnvelope {
    pub seq: u64,
    pub attempt: u32,
    pub payload: JobPayload,
}

impl JobEnvelope {
    /// Same job, next attempt
    pub fn next_attempt(&self) -> Self {
        Self {
            seq: self.seq,
            attempt: self.attempt + 1,
            payload: self.payload.clone(),
        }
    }
}

/// TaskBroker hands queued jobs to the worker pool
///
/// Architecture:
/// 1. Producers call `broker.enqueue(payload)`, which assigns a sequence number
/// 2. The envelope goes to the back of a shared in-memory queue
/// 3. Idle processors are woken via `Notify`; they also poll on their own interval
/// 4. Failed attempts come back through `schedule_retry` after the policy delay
///
/// Nothing is persisted: the queue lives as long as the process.
pub struct TaskBroker {
    queue_name: String,
    pending: Mutex<VecDeque<JobEnvelope>>,
    notify: Notify,
    next_seq: AtomicU64,
}

impl TaskBroker {
    pub fn new(queue_name: impl Into<String>) -> Self {
        let queue_name = queue_name.into();
        info!(queue = %queue_name, "Creating TaskBroker");

        Self {
            queue_name,
            pending: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            next_seq: AtomicU64::new(0),
        }
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    /// Enqueue a first attempt and return its sequence number
    pub fn enqueue(&self, payload: JobPayload) -> u64 {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let build_id = payload.build_id;

        self.push(JobEnvelope {
            seq,
            attempt: 1,
            payload,
        });

        debug!(seq, build_id, queue = %self.queue_name, "Job enqueued");
        seq
    }

    /// Put an envelope back at the tail of the queue
    pub fn requeue(&self, envelope: JobEnvelope) {
        debug!(seq = envelope.seq, attempt = envelope.attempt, "Job re-enqueued");
        self.push(envelope);
    }

    /// Requeue `envelope` once `delay` has elapsed
    pub fn schedule_retry(self: &Arc<Self>, envelope: JobEnvelope, delay: Duration) {
        let broker = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            broker.requeue(envelope);
        });
    }

    pub fn pop(&self) -> Option<JobEnvelope> {
        match self.pending.lock() {
            Ok(mut pending) => pending.pop_front(),
            Err(_) => {
                warn!(queue = %self.queue_name, "Queue lock poisoned");
                None
            }
        }
    }

    /// Number of jobs waiting for a processor
    pub fn depth(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }

    /// Resolves when a job is pushed. May also resolve spuriously.
    pub async fn notified(&self) {
        self.notify.notified().await;
    }

    fn push(&self, envelope: JobEnvelope) {
        match self.pending.lock() {
            Ok(mut pending) => pending.push_back(envelope),
            Err(_) => {
                warn!(seq = envelope.seq, queue = %self.queue_name, "Queue lock poisoned, job dropped");
                return;
            }
        }
        self.notify.notify_one();
    }
}
