//! In-Memory Queue Backend
//!
//! Channel-backed stand-in for the external task-queue service. Delivery is
//! at-least-once: a consumer crash after dequeue simply means the dispatcher
//! re-enqueues equivalent work on its next pass.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::{Mutex, RwLock};
use tracing::warn;
use uuid::Uuid;

use crate::error::{Result, SyncError};
use crate::queue::{DeadLetterEntry, PersistJob, PersistTask, RequeueOutcome, TaskQueue};

// == Memory Queue ==
/// In-memory `TaskQueue` backend.
pub struct MemoryQueue {
    tx: UnboundedSender<PersistJob>,
    rx: Mutex<UnboundedReceiver<PersistJob>>,
    pending: AtomicUsize,
    dead: RwLock<Vec<DeadLetterEntry>>,
    max_attempts: u32,
}

impl MemoryQueue {
    /// Creates a queue that dead-letters jobs after `max_attempts`
    /// deliveries.
    pub fn new(max_attempts: u32) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
            pending: AtomicUsize::new(0),
            dead: RwLock::new(Vec::new()),
            max_attempts,
        }
    }

    /// Dead-letter entries for operator inspection.
    pub async fn dead_letters(&self) -> Vec<DeadLetterEntry> {
        self.dead.read().await.clone()
    }

    fn push(&self, job: PersistJob) -> Result<()> {
        self.tx
            .send(job)
            .map_err(|_| SyncError::Internal("persistence queue closed".to_string()))?;
        self.pending.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl TaskQueue for MemoryQueue {
    async fn enqueue(&self, task: PersistTask) -> Result<Uuid> {
        let job = PersistJob::new(task);
        let job_id = job.job_id;
        self.push(job)?;
        Ok(job_id)
    }

    async fn dequeue(&self) -> Option<PersistJob> {
        let job = self.rx.lock().await.recv().await;
        if job.is_some() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
        }
        job
    }

    async fn try_dequeue(&self) -> Option<PersistJob> {
        let job = self.rx.lock().await.try_recv().ok();
        if job.is_some() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
        }
        job
    }

    async fn requeue(&self, mut job: PersistJob, reason: &str) -> Result<RequeueOutcome> {
        job.attempt += 1;
        if job.attempt > self.max_attempts {
            warn!(
                job_id = %job.job_id,
                kind = job.task.kind(),
                attempts = job.attempt - 1,
                reason,
                "persistence job exhausted attempts, dead-lettering"
            );
            self.dead_letter(job, reason).await;
            return Ok(RequeueOutcome::DeadLettered);
        }
        self.push(job)?;
        Ok(RequeueOutcome::Requeued)
    }

    async fn dead_letter(&self, job: PersistJob, reason: &str) {
        self.dead.write().await.push(DeadLetterEntry {
            job,
            reason: reason.to_string(),
            failed_at: Utc::now(),
        });
    }

    async fn pending_count(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    async fn dead_letter_count(&self) -> usize {
        self.dead.read().await.len()
    }
}
