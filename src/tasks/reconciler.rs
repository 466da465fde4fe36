//! Persistence Reconciler
//!
//! Background task that periodically scans cache entries nearing TTL expiry
//! and dispatches persistence jobs for anything newer than the durable
//! store. The scan interval is configured strictly below the TTL floor, so
//! every entry is seen before it can expire.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::{CacheKey, CacheStore, KeyPattern, MessageTier, VersionedEntry};
use crate::context::SyncContext;
use crate::durable::DurableStore;
use crate::entities::OwnerId;
use crate::error::Result;
use crate::queue::{PersistTask, TaskQueue};

// == Reconciler Stats ==
/// Cumulative pass counters surfaced by the diagnostics endpoint.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcilerStats {
    /// Completed passes since startup
    pub passes: u64,
    /// Keys inspected across all passes
    pub keys_scanned: u64,
    /// Stale (cache-ahead-of-durable) keys seen in the last pass
    pub stale_keys: u64,
    /// Jobs dispatched across all passes
    pub jobs_dispatched: u64,
    /// Per-key reconcile failures across all passes
    pub key_errors: u64,
    /// When the last pass completed
    pub last_pass_at: Option<DateTime<Utc>>,
}

// == Pass Summary ==
/// Outcome of a single reconciler pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassSummary {
    /// Keys inspected
    pub scanned: usize,
    /// Keys found ahead of the durable store
    pub stale: usize,
    /// Jobs handed to the queue
    pub dispatched: usize,
    /// Keys that failed to reconcile
    pub errors: usize,
}

/// What a single key contributed to the pass.
enum KeyAction {
    Skipped,
    Dispatched(usize),
}

/// Runs one reconciler pass over both persistable key families.
///
/// Per-key failures are logged and skipped so one bad entry cannot halt the
/// batch; a store-level scan failure aborts the pass, which is retried on
/// the next scheduled interval.
pub async fn run_reconciler_pass(ctx: &SyncContext) -> Result<PassSummary> {
    let warn_ms = ctx.config.ttl_warning_threshold().as_millis() as u64;
    let mut summary = PassSummary::default();

    for pattern in [KeyPattern::ListItems, KeyPattern::SyncMessages] {
        let keys = ctx
            .cache
            .scan_keys(pattern, ctx.config.scan_batch_size)
            .await?;

        for key in keys {
            summary.scanned += 1;
            match reconcile_key(ctx, &key, warn_ms).await {
                Ok(KeyAction::Skipped) => {}
                Ok(KeyAction::Dispatched(jobs)) => {
                    summary.stale += 1;
                    summary.dispatched += jobs;
                }
                Err(err) => {
                    warn!(key = %key, error = %err, "failed to reconcile cache key");
                    summary.errors += 1;
                }
            }
        }
    }

    let mut stats = ctx.stats.write().await;
    stats.passes += 1;
    stats.keys_scanned += summary.scanned as u64;
    stats.stale_keys = summary.stale as u64;
    stats.jobs_dispatched += summary.dispatched as u64;
    stats.key_errors += summary.errors as u64;
    stats.last_pass_at = Some(Utc::now());

    Ok(summary)
}

/// Reconciles a single key: TTL check, version compare, ensure, dispatch.
async fn reconcile_key(ctx: &SyncContext, key: &CacheKey, warn_ms: u64) -> Result<KeyAction> {
    let Some(entry) = ctx.cache.get(key).await? else {
        return Ok(KeyAction::Skipped);
    };

    // Entries comfortably away from expiry wait for a later pass.
    if entry.ttl_remaining_ms() > warn_ms {
        return Ok(KeyAction::Skipped);
    }

    match key {
        CacheKey::ListItem { owner_id, chat_id } => {
            reconcile_list_item(ctx, *chat_id, owner_id, &entry).await
        }
        CacheKey::Messages {
            chat_id,
            tier: MessageTier::Sync,
        } => reconcile_sync_messages(ctx, *chat_id, &entry).await,
        // The AI tier is never persisted and never scanned here.
        CacheKey::Messages {
            tier: MessageTier::Ai,
            ..
        } => Ok(KeyAction::Skipped),
    }
}

async fn reconcile_list_item(
    ctx: &SyncContext,
    chat_id: Uuid,
    owner_id: &OwnerId,
    entry: &VersionedEntry,
) -> Result<KeyAction> {
    let Some(bundle) = entry.payload.as_list_item() else {
        warn!(%chat_id, "list-item key holds a foreign payload, skipping");
        return Ok(KeyAction::Skipped);
    };

    let title_durable = ctx
        .durable
        .get_chat(chat_id)
        .await?
        .map(|c| c.title_version)
        .unwrap_or(0);
    let draft_durable = ctx
        .durable
        .get_draft(chat_id, owner_id)
        .await?
        .map(|d| d.version)
        .unwrap_or(0);

    let mut dispatched = 0;

    // Covers drafts created before any message was ever persisted: the
    // durable chat may not exist yet.
    if (bundle.has_title() && entry.version > title_durable)
        || (bundle.has_draft() && entry.version > draft_durable)
    {
        ctx.lifecycle.ensure_chat_exists(chat_id, owner_id).await?;
    } else {
        return Ok(KeyAction::Skipped);
    }

    if entry.version > title_durable {
        if let Some(title) = &bundle.encrypted_title {
            ctx.queue
                .enqueue(PersistTask::Title {
                    chat_id,
                    owner_id: owner_id.clone(),
                    encrypted_title: title.clone(),
                    version: entry.version,
                    edited_at: Utc::now(),
                })
                .await?;
            dispatched += 1;
        }
    }

    if entry.version > draft_durable {
        if let Some(slot) = &bundle.draft {
            ctx.queue
                .enqueue(PersistTask::Draft {
                    chat_id,
                    owner_id: owner_id.clone(),
                    content: slot.content.clone(),
                    version: entry.version,
                    edited_at: slot.edited_at,
                })
                .await?;
            dispatched += 1;
        }
    }

    if dispatched > 0 {
        debug!(%chat_id, version = entry.version, dispatched, "list-item jobs dispatched");
        Ok(KeyAction::Dispatched(dispatched))
    } else {
        Ok(KeyAction::Skipped)
    }
}

async fn reconcile_sync_messages(
    ctx: &SyncContext,
    chat_id: Uuid,
    entry: &VersionedEntry,
) -> Result<KeyAction> {
    let Some(batch) = entry.payload.as_messages() else {
        warn!(%chat_id, "messages key holds a foreign payload, skipping");
        return Ok(KeyAction::Skipped);
    };

    let durable_version = ctx
        .durable
        .get_chat(chat_id)
        .await?
        .map(|c| c.messages_version)
        .unwrap_or(0);
    if entry.version <= durable_version {
        return Ok(KeyAction::Skipped);
    }

    ctx.lifecycle
        .ensure_chat_exists(chat_id, &batch.owner_id)
        .await?;

    let mut missing = Vec::new();
    for message in &batch.messages {
        if !ctx.durable.has_message(message.message_id).await? {
            missing.push(message);
        }
    }

    // Every message already durable but the version understated: a runner
    // died between the insert and the bump. Any one job re-carries the
    // version; the idempotent insert makes it safe.
    if missing.is_empty() {
        let Some(last) = batch.messages.last() else {
            return Ok(KeyAction::Skipped);
        };
        missing.push(last);
    }

    let mut dispatched = 0;
    for message in missing {
        ctx.queue
            .enqueue(PersistTask::Message {
                chat_id,
                owner_id: batch.owner_id.clone(),
                message: message.clone(),
                messages_version: entry.version,
            })
            .await?;
        dispatched += 1;
    }

    debug!(%chat_id, version = entry.version, dispatched, "message jobs dispatched");
    Ok(KeyAction::Dispatched(dispatched))
}

/// Spawns the periodic reconciler.
///
/// The task runs in an infinite loop, sleeping for the scan interval between
/// passes. The returned handle is aborted during graceful shutdown; jobs
/// already dispatched stay in the queue (at-least-once delivery, absorbed by
/// the runner's version checks).
pub fn spawn_reconciler_task(ctx: Arc<SyncContext>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Starting persistence reconciler with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            match run_reconciler_pass(&ctx).await {
                Ok(summary) if summary.dispatched > 0 || summary.errors > 0 => {
                    info!(
                        scanned = summary.scanned,
                        stale = summary.stale,
                        dispatched = summary.dispatched,
                        errors = summary.errors,
                        "reconciler pass complete"
                    );
                }
                Ok(summary) => {
                    debug!(scanned = summary.scanned, "reconciler pass found nothing stale");
                }
                Err(err) => {
                    // Store-level failure: abandon this pass, no retry storm.
                    warn!(error = %err, "reconciler pass aborted, retrying next interval");
                }
            }
        }
    })
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CachePayload, DraftSlot, ListItemBundle};
    use crate::config::Config;
    use crate::domain::{Ciphertext, USER_PREFIX};
    use crate::entities::OwnerId;
    use uuid::Uuid;

    fn user_ct(body: &str) -> Ciphertext {
        Ciphertext::from_wire(format!("{USER_PREFIX}{body}"))
    }

    fn draft_bundle(content: &str) -> CachePayload {
        CachePayload::ListItem(ListItemBundle {
            encrypted_title: None,
            draft: Some(DraftSlot {
                content: Some(user_ct(content)),
                edited_at: Utc::now(),
            }),
            category: None,
        })
    }

    #[tokio::test]
    async fn test_pass_skips_entries_far_from_expiry() {
        let ctx = SyncContext::in_memory(Config::default());
        let key = CacheKey::list_item(OwnerId::from_raw("alice"), Uuid::new_v4());

        let v = ctx.cache.bump_version(&key).await.unwrap();
        // Full TTL: well above the 300s warning threshold.
        ctx.cache
            .set(&key, draft_bundle("d"), v, ctx.config.cache_ttl())
            .await
            .unwrap();

        let summary = run_reconciler_pass(&ctx).await.unwrap();
        assert_eq!(summary.scanned, 1);
        assert_eq!(summary.dispatched, 0);
        assert_eq!(ctx.queue.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_pass_dispatches_inside_warning_window() {
        let ctx = SyncContext::in_memory(Config::default());
        let chat_id = Uuid::new_v4();
        let owner = OwnerId::from_raw("alice");
        let key = CacheKey::list_item(owner.clone(), chat_id);

        let v = ctx.cache.bump_version(&key).await.unwrap();
        // 120s remaining: inside the 300s warning window.
        ctx.cache
            .set(&key, draft_bundle("d"), v, Duration::from_secs(120))
            .await
            .unwrap();

        let summary = run_reconciler_pass(&ctx).await.unwrap();
        assert_eq!(summary.stale, 1);
        assert_eq!(summary.dispatched, 1);
        assert_eq!(ctx.queue.pending_count().await, 1);

        // The durable chat record was ensured before dispatch.
        assert!(ctx.durable.get_chat(chat_id).await.unwrap().is_some());
        // Dispatch never deletes the cache entry.
        assert!(ctx.cache.get(&key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_pass_updates_stats() {
        let ctx = SyncContext::in_memory(Config::default());
        let key = CacheKey::list_item(OwnerId::from_raw("alice"), Uuid::new_v4());

        let v = ctx.cache.bump_version(&key).await.unwrap();
        ctx.cache
            .set(&key, draft_bundle("d"), v, Duration::from_secs(60))
            .await
            .unwrap();

        run_reconciler_pass(&ctx).await.unwrap();

        let stats = ctx.stats.read().await;
        assert_eq!(stats.passes, 1);
        assert_eq!(stats.keys_scanned, 1);
        assert_eq!(stats.stale_keys, 1);
        assert_eq!(stats.jobs_dispatched, 1);
        assert!(stats.last_pass_at.is_some());
    }

    #[tokio::test]
    async fn test_spawned_task_can_be_aborted() {
        let ctx = SyncContext::in_memory(Config::default());
        let handle = spawn_reconciler_task(ctx, Duration::from_secs(1));

        handle.abort();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
