//! Queue Module
//!
//! Persistence task queue with at-least-once delivery and no ordering
//! guarantee between jobs. Consumers are idempotent (version-guarded), so
//! duplicate delivery is harmless.

mod job;
mod memory;

pub use job::{DeadLetterEntry, PersistJob, PersistTask, RequeueOutcome, TaskQueue};
pub use memory::MemoryQueue;
