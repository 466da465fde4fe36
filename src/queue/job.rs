//! Persistence Jobs
//!
//! Job payloads carry everything the runner needs: the cache payload, the
//! target entity, and the version to write. Dispatch never deletes cache
//! entries; that is the runner's responsibility after a confirmed write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Ciphertext;
use crate::entities::{Message, OwnerId};
use crate::error::Result;

// == Persist Task ==
/// A single persistence operation against the durable store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PersistTask {
    /// Write a chat title at `version`
    Title {
        chat_id: Uuid,
        owner_id: OwnerId,
        encrypted_title: Ciphertext,
        version: u64,
        edited_at: DateTime<Utc>,
    },
    /// Write (or clear) a draft at `version`
    Draft {
        chat_id: Uuid,
        owner_id: OwnerId,
        content: Option<Ciphertext>,
        version: u64,
        edited_at: DateTime<Utc>,
    },
    /// Insert a message, then raise `messages_version`
    Message {
        chat_id: Uuid,
        owner_id: OwnerId,
        message: Message,
        messages_version: u64,
    },
}

impl PersistTask {
    /// The chat this task targets.
    pub fn chat_id(&self) -> Uuid {
        match self {
            PersistTask::Title { chat_id, .. } => *chat_id,
            PersistTask::Draft { chat_id, .. } => *chat_id,
            PersistTask::Message { chat_id, .. } => *chat_id,
        }
    }

    /// The owner of the targeted chat.
    pub fn owner_id(&self) -> &OwnerId {
        match self {
            PersistTask::Title { owner_id, .. } => owner_id,
            PersistTask::Draft { owner_id, .. } => owner_id,
            PersistTask::Message { owner_id, .. } => owner_id,
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PersistTask::Title { .. } => "title",
            PersistTask::Draft { .. } => "draft",
            PersistTask::Message { .. } => "message",
        }
    }
}

// == Persist Job ==
/// A queued task with its delivery bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistJob {
    /// Queue-assigned id
    pub job_id: Uuid,
    /// Delivery attempt, starting at 1
    pub attempt: u32,
    /// The operation to execute
    pub task: PersistTask,
}

impl PersistJob {
    /// Wraps a task as a first-attempt job.
    pub fn new(task: PersistTask) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            attempt: 1,
            task,
        }
    }
}

// == Requeue Outcome ==
/// Result of handing a failed job back to the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequeueOutcome {
    /// Re-enqueued for another attempt
    Requeued,
    /// Attempts exhausted; moved to the dead-letter ledger
    DeadLettered,
}

// == Dead Letter Entry ==
/// A job that exhausted its attempts or failed fatally.
#[derive(Debug, Clone)]
pub struct DeadLetterEntry {
    pub job: PersistJob,
    pub reason: String,
    pub failed_at: DateTime<Utc>,
}

// == Task Queue ==
/// At-least-once persistence queue.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Enqueues a task and returns its job id.
    async fn enqueue(&self, task: PersistTask) -> Result<Uuid>;

    /// Awaits the next job. Returns None when the queue is closed.
    async fn dequeue(&self) -> Option<PersistJob>;

    /// Takes the next job without waiting, if one is ready.
    async fn try_dequeue(&self) -> Option<PersistJob>;

    /// Hands a transiently-failed job back: re-enqueued with an incremented
    /// attempt, or dead-lettered once attempts are exhausted.
    async fn requeue(&self, job: PersistJob, reason: &str) -> Result<RequeueOutcome>;

    /// Moves a fatally-failed job straight to the dead-letter ledger.
    async fn dead_letter(&self, job: PersistJob, reason: &str);

    /// Jobs currently waiting for a worker.
    async fn pending_count(&self) -> usize;

    /// Jobs parked for operator inspection.
    async fn dead_letter_count(&self) -> usize;
}
