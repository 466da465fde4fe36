//! Engine Context
//!
//! Explicit handles to the composed stores and services, created at startup
//! and passed by reference everywhere. Nothing in the engine reaches for a
//! process-global client.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::cache::{CacheStore, MemoryCache};
use crate::config::Config;
use crate::domain::DomainGuard;
use crate::durable::{DurableStore, MemoryDurableStore};
use crate::keysvc::{EnvelopeKeyService, KeyService};
use crate::lifecycle::ChatLifecycleManager;
use crate::queue::{MemoryQueue, TaskQueue};
use crate::tasks::ReconcilerStats;

// == Sync Context ==
/// Dependency bundle for the engine's components.
pub struct SyncContext {
    /// Engine configuration
    pub config: Config,
    /// TTL-bounded cache tier
    pub cache: Arc<dyn CacheStore>,
    /// System-of-record store
    pub durable: Arc<dyn DurableStore>,
    /// Envelope-key service
    pub keys: Arc<dyn KeyService>,
    /// Persistence task queue
    pub queue: Arc<dyn TaskQueue>,
    /// Idempotent chat creation
    pub lifecycle: Arc<ChatLifecycleManager>,
    /// Encryption-domain guard and violation ledger
    pub guard: Arc<DomainGuard>,
    /// Reconciler pass counters for diagnostics
    pub stats: Arc<RwLock<ReconcilerStats>>,
}

impl SyncContext {
    /// Composes a context from explicit store handles.
    pub fn new(
        config: Config,
        cache: Arc<dyn CacheStore>,
        durable: Arc<dyn DurableStore>,
        keys: Arc<dyn KeyService>,
        queue: Arc<dyn TaskQueue>,
    ) -> Arc<Self> {
        let lifecycle = Arc::new(ChatLifecycleManager::new(durable.clone(), keys.clone()));
        Arc::new(Self {
            config,
            cache,
            durable,
            keys,
            queue,
            lifecycle,
            guard: Arc::new(DomainGuard::new()),
            stats: Arc::new(RwLock::new(ReconcilerStats::default())),
        })
    }

    /// Composes a context over in-memory backends, for local runs and tests.
    pub fn in_memory(config: Config) -> Arc<Self> {
        let queue = Arc::new(MemoryQueue::new(config.max_job_attempts));
        Self::new(
            config,
            Arc::new(MemoryCache::new()),
            Arc::new(MemoryDurableStore::new()),
            Arc::new(EnvelopeKeyService::new()),
            queue,
        )
    }
}
