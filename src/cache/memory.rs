//! In-Memory Cache Backend
//!
//! Process-local stand-in for the external key-value service. Keys are
//! stored in their wire form; the version counters live beside the entries
//! so that clearing a persisted payload does not rewind its counter.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::cache::{CacheKey, CachePayload, CacheStore, KeyPattern, VersionedEntry};
use crate::error::Result;

#[derive(Debug, Default)]
struct CacheInner {
    /// Live entries by wire-form key
    entries: HashMap<String, VersionedEntry>,
    /// Retained version counters, surviving payload deletion
    versions: HashMap<String, u64>,
}

// == Memory Cache ==
/// In-memory `CacheStore` backend.
#[derive(Debug, Default)]
pub struct MemoryCache {
    inner: RwLock<CacheInner>,
}

impl MemoryCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (possibly expired, not yet dropped) entries.
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    /// Whether the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<VersionedEntry>> {
        let wire = key.to_string();
        let mut inner = self.inner.write().await;

        let expired = match inner.entries.get(&wire) {
            Some(entry) => entry.is_expired(),
            None => return Ok(None),
        };
        if expired {
            // Lazy drop; the version counter stays.
            inner.entries.remove(&wire);
            return Ok(None);
        }
        Ok(inner.entries.get(&wire).cloned())
    }

    async fn set(
        &self,
        key: &CacheKey,
        payload: CachePayload,
        version: u64,
        ttl: Duration,
    ) -> Result<()> {
        let wire = key.to_string();
        let mut inner = self.inner.write().await;

        inner
            .entries
            .insert(wire.clone(), VersionedEntry::new(payload, version, ttl));

        let counter = inner.versions.entry(wire).or_insert(0);
        if *counter < version {
            *counter = version;
        }
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool> {
        let wire = key.to_string();
        let mut inner = self.inner.write().await;
        Ok(inner.entries.remove(&wire).is_some())
    }

    async fn remove_entity(&self, key: &CacheKey) -> Result<bool> {
        let wire = key.to_string();
        let mut inner = self.inner.write().await;
        let had_entry = inner.entries.remove(&wire).is_some();
        let had_counter = inner.versions.remove(&wire).is_some();
        Ok(had_entry || had_counter)
    }

    async fn scan_keys(&self, pattern: KeyPattern, limit: usize) -> Result<Vec<CacheKey>> {
        let inner = self.inner.read().await;

        let mut keys = Vec::new();
        for (wire, entry) in &inner.entries {
            if entry.is_expired() {
                continue;
            }
            // Keys the engine did not write itself parse or are skipped.
            let Ok(key) = wire.parse::<CacheKey>() else {
                continue;
            };
            if pattern.matches(&key) {
                keys.push(key);
                if keys.len() >= limit {
                    break;
                }
            }
        }
        Ok(keys)
    }

    async fn bump_version(&self, key: &CacheKey) -> Result<u64> {
        let wire = key.to_string();
        let mut inner = self.inner.write().await;

        let counter = inner.versions.entry(wire).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ListItemBundle;
    use crate::entities::OwnerId;
    use uuid::Uuid;

    fn list_key() -> CacheKey {
        CacheKey::list_item(OwnerId::from_raw("alice"), Uuid::new_v4())
    }

    fn empty_payload() -> CachePayload {
        CachePayload::ListItem(ListItemBundle::default())
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = MemoryCache::new();
        let key = list_key();

        cache
            .set(&key, empty_payload(), 1, Duration::from_secs(60))
            .await
            .unwrap();

        let entry = cache.get(&key).await.unwrap().unwrap();
        assert_eq!(entry.version, 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let cache = MemoryCache::new();
        assert!(cache.get(&list_key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_reports_absent() {
        let cache = MemoryCache::new();
        let key = list_key();

        cache
            .set(&key, empty_payload(), 1, Duration::from_millis(20))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(cache.get(&key).await.unwrap().is_none());
        // Lazy drop removed the payload.
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_bump_version_starts_from_zero() {
        let cache = MemoryCache::new();
        let key = list_key();

        assert_eq!(cache.bump_version(&key).await.unwrap(), 1);
        assert_eq!(cache.bump_version(&key).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_delete_retains_version_counter() {
        let cache = MemoryCache::new();
        let key = list_key();

        let v = cache.bump_version(&key).await.unwrap();
        cache
            .set(&key, empty_payload(), v, Duration::from_secs(60))
            .await
            .unwrap();

        assert!(cache.delete(&key).await.unwrap());
        assert!(cache.get(&key).await.unwrap().is_none());

        // A later write continues the sequence above the deleted entry.
        assert_eq!(cache.bump_version(&key).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_remove_entity_resets_version_counter() {
        let cache = MemoryCache::new();
        let key = list_key();

        cache.bump_version(&key).await.unwrap();
        cache.bump_version(&key).await.unwrap();
        assert!(cache.remove_entity(&key).await.unwrap());

        assert_eq!(cache.bump_version(&key).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_set_raises_retained_counter() {
        let cache = MemoryCache::new();
        let key = list_key();

        cache
            .set(&key, empty_payload(), 5, Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(cache.bump_version(&key).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_scan_keys_by_pattern() {
        use crate::cache::{MessageBatch, MessageTier};

        let cache = MemoryCache::new();
        let owner = OwnerId::from_raw("alice");
        let chat = Uuid::new_v4();

        cache
            .set(
                &CacheKey::list_item(owner.clone(), chat),
                empty_payload(),
                1,
                Duration::from_secs(60),
            )
            .await
            .unwrap();
        cache
            .set(
                &CacheKey::messages(chat, MessageTier::Sync),
                CachePayload::Messages(MessageBatch {
                    owner_id: owner.clone(),
                    messages: vec![],
                }),
                1,
                Duration::from_secs(60),
            )
            .await
            .unwrap();
        cache
            .set(
                &CacheKey::messages(chat, MessageTier::Ai),
                CachePayload::Messages(MessageBatch {
                    owner_id: owner,
                    messages: vec![],
                }),
                1,
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        let list = cache.scan_keys(KeyPattern::ListItems, 10).await.unwrap();
        let sync = cache.scan_keys(KeyPattern::SyncMessages, 10).await.unwrap();
        let ai = cache.scan_keys(KeyPattern::AiMessages, 10).await.unwrap();

        assert_eq!(list.len(), 1);
        assert_eq!(sync.len(), 1);
        assert_eq!(ai.len(), 1);
        assert!(KeyPattern::SyncMessages.matches(&sync[0]));
    }

    #[tokio::test]
    async fn test_scan_respects_batch_limit() {
        let cache = MemoryCache::new();
        for _ in 0..20 {
            cache
                .set(&list_key(), empty_payload(), 1, Duration::from_secs(60))
                .await
                .unwrap();
        }

        let keys = cache.scan_keys(KeyPattern::ListItems, 5).await.unwrap();
        assert_eq!(keys.len(), 5);
    }

    #[tokio::test]
    async fn test_scan_skips_expired() {
        let cache = MemoryCache::new();
        let key = list_key();

        cache
            .set(&key, empty_payload(), 1, Duration::from_millis(20))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let keys = cache.scan_keys(KeyPattern::ListItems, 10).await.unwrap();
        assert!(keys.is_empty());
    }
}
