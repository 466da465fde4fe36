//! Chatsync - Write-back chat state cache with persistence reconciliation
//!
//! Maintains mutable conversational state across a TTL-bounded cache tier
//! and a durable system of record, guaranteeing no silent data loss on
//! cache eviction and no encryption-domain contamination between tiers.

pub mod api;
pub mod cache;
pub mod config;
pub mod context;
pub mod domain;
pub mod durable;
pub mod entities;
pub mod error;
pub mod flush;
pub mod keysvc;
pub mod lifecycle;
pub mod models;
pub mod queue;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use context::SyncContext;
pub use tasks::{spawn_reconciler_task, spawn_runner_task};
