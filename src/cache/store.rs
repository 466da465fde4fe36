//! Cache Store Trait
//!
//! Narrow interface over the external TTL-capable key-value service. The
//! engine holds no in-process locks across workers; all cross-worker
//! coordination goes through the version-compare protocol this trait
//! exposes.

use std::time::Duration;

use async_trait::async_trait;

use crate::cache::{CacheKey, CachePayload, KeyPattern, VersionedEntry};
use crate::error::Result;

// == Cache Store ==
/// Versioned, TTL-bounded key-value store.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Retrieves an entry. Expired entries report as absent.
    async fn get(&self, key: &CacheKey) -> Result<Option<VersionedEntry>>;

    /// Stores a payload under `key` at `version`, expiring `ttl` from now.
    ///
    /// Overwrites any existing entry; the retained version counter is raised
    /// to `version` if it is behind.
    async fn set(
        &self,
        key: &CacheKey,
        payload: CachePayload,
        version: u64,
        ttl: Duration,
    ) -> Result<()>;

    /// Removes the payload for `key`, returning whether one existed.
    ///
    /// The per-key version counter is retained: a later write continues the
    /// sequence instead of restarting below the durable version.
    async fn delete(&self, key: &CacheKey) -> Result<bool>;

    /// Explicit entity deletion: removes the payload and the version counter.
    async fn remove_entity(&self, key: &CacheKey) -> Result<bool>;

    /// Enumerates live keys in a family, bounded by `limit`.
    ///
    /// Reconciler-only; the bound keeps a scan pass from blocking the store.
    async fn scan_keys(&self, pattern: KeyPattern, limit: usize) -> Result<Vec<CacheKey>>;

    /// Atomically increments the version counter for `key` and returns the
    /// new value.
    ///
    /// Counters start at 0; the increment is free of lost updates under
    /// concurrent callers.
    async fn bump_version(&self, key: &CacheKey) -> Result<u64>;
}
