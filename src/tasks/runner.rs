//! Persistence Task Runner
//!
//! Executes queued persist operations against the durable store. Writes are
//! version-guarded (duplicate dispatch is a benign no-op) and cache entries
//! are cleared only after the durable store has confirmably caught up —
//! deletion is a separate step, so a crash in between leaves a harmless
//! stale-but-superseded entry rather than lost data.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::{CacheKey, CacheStore, MessageTier};
use crate::context::SyncContext;
use crate::domain::EncryptionDomain;
use crate::durable::DurableStore;
use crate::entities::{Draft, OwnerId};
use crate::error::{Result, SyncError};
use crate::queue::{PersistJob, PersistTask, TaskQueue};

// == Persist Outcome ==
/// Result of a successfully executed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    /// The durable store was written
    Persisted,
    /// The durable store was already at or past this version
    Superseded,
}

/// Executes a single persistence job.
pub async fn execute_job(ctx: &SyncContext, job: &PersistJob) -> Result<PersistOutcome> {
    match &job.task {
        PersistTask::Title {
            chat_id,
            owner_id,
            encrypted_title,
            version,
            edited_at,
        } => {
            ctx.guard
                .assert_domain(
                    encrypted_title,
                    EncryptionDomain::User,
                    &format!("durable:chats:{chat_id}:title"),
                )
                .await?;
            ctx.lifecycle.ensure_chat_exists(*chat_id, owner_id).await?;

            let written = ctx
                .durable
                .update_title(*chat_id, encrypted_title.clone(), *version, *edited_at)
                .await?;
            maybe_clear_list_item(ctx, owner_id, *chat_id).await?;
            Ok(outcome(written))
        }

        PersistTask::Draft {
            chat_id,
            owner_id,
            content,
            version,
            edited_at,
        } => {
            if let Some(ciphertext) = content {
                ctx.guard
                    .assert_domain(
                        ciphertext,
                        EncryptionDomain::User,
                        &format!("durable:drafts:{chat_id}"),
                    )
                    .await?;
            }
            ctx.lifecycle.ensure_chat_exists(*chat_id, owner_id).await?;

            let written = ctx
                .durable
                .upsert_draft(Draft {
                    chat_id: *chat_id,
                    owner_id: owner_id.clone(),
                    encrypted_content: content.clone(),
                    version: *version,
                    last_edited: *edited_at,
                })
                .await?;
            maybe_clear_list_item(ctx, owner_id, *chat_id).await?;
            Ok(outcome(written))
        }

        PersistTask::Message {
            chat_id,
            owner_id,
            message,
            messages_version,
        } => {
            ctx.guard
                .assert_domain(
                    &message.encrypted_content,
                    EncryptionDomain::User,
                    &format!("durable:messages:{}", message.message_id),
                )
                .await?;
            ctx.lifecycle.ensure_chat_exists(*chat_id, owner_id).await?;

            // The message write happens-before the version bump: a crash in
            // between leaves the durable version understated, which only
            // triggers a harmless re-scan. Overstated would be silent loss.
            ctx.durable.insert_message(message.clone()).await?;
            let bumped = ctx
                .durable
                .set_messages_version(*chat_id, *messages_version, message.created_at)
                .await?;

            maybe_clear_sync_messages(ctx, *chat_id).await?;
            Ok(outcome(bumped))
        }
    }
}

fn outcome(written: bool) -> PersistOutcome {
    if written {
        PersistOutcome::Persisted
    } else {
        PersistOutcome::Superseded
    }
}

/// Clears the list-item cache entry once every sub-resource it carries is
/// durably at or above the entry's version.
pub(crate) async fn maybe_clear_list_item(
    ctx: &SyncContext,
    owner_id: &OwnerId,
    chat_id: Uuid,
) -> Result<()> {
    let key = CacheKey::list_item(owner_id.clone(), chat_id);
    let Some(entry) = ctx.cache.get(&key).await? else {
        return Ok(());
    };
    let Some(bundle) = entry.payload.as_list_item() else {
        return Ok(());
    };

    let title_caught_up = if bundle.has_title() {
        ctx.durable
            .get_chat(chat_id)
            .await?
            .map(|c| c.title_version)
            .unwrap_or(0)
            >= entry.version
    } else {
        true
    };
    let draft_caught_up = if bundle.has_draft() {
        ctx.durable
            .get_draft(chat_id, owner_id)
            .await?
            .map(|d| d.version)
            .unwrap_or(0)
            >= entry.version
    } else {
        true
    };

    if title_caught_up && draft_caught_up {
        ctx.cache.delete(&key).await?;
        debug!(%chat_id, version = entry.version, "list-item cache entry cleared");
    }
    Ok(())
}

/// Clears the sync messages entry once the durable version has caught up.
pub(crate) async fn maybe_clear_sync_messages(ctx: &SyncContext, chat_id: Uuid) -> Result<()> {
    let key = CacheKey::messages(chat_id, MessageTier::Sync);
    let Some(entry) = ctx.cache.get(&key).await? else {
        return Ok(());
    };

    let durable_version = ctx
        .durable
        .get_chat(chat_id)
        .await?
        .map(|c| c.messages_version)
        .unwrap_or(0);

    if durable_version >= entry.version {
        ctx.cache.delete(&key).await?;
        debug!(%chat_id, version = entry.version, "sync messages cache entry cleared");
    }
    Ok(())
}

/// Handles one dequeued job, reporting failures to the queue.
async fn handle_job(ctx: &SyncContext, job: PersistJob) {
    let job_id = job.job_id;
    let kind = job.task.kind();

    match execute_job(ctx, &job).await {
        Ok(PersistOutcome::Persisted) => {
            debug!(%job_id, kind, "persistence job complete");
        }
        Ok(PersistOutcome::Superseded) => {
            // Duplicate dispatch under at-least-once delivery.
            debug!(%job_id, kind, "persistence job superseded, no-op");
        }
        Err(SyncError::TransientStore(reason)) => {
            warn!(%job_id, kind, %reason, "transient failure, handing job back");
            if let Err(err) = ctx.queue.requeue(job, &reason).await {
                warn!(%job_id, error = %err, "failed to requeue job");
            }
        }
        Err(err) => {
            warn!(%job_id, kind, error = %err, "fatal failure, dead-lettering job");
            ctx.queue.dead_letter(job, &err.to_string()).await;
        }
    }
}

/// Processes every job currently in the queue, without waiting for more.
///
/// Returns the number of jobs handled. Used at shutdown and by tests that
/// need deterministic draining.
pub async fn drain_queue(ctx: &SyncContext) -> usize {
    let mut handled = 0;
    while let Some(job) = ctx.queue.try_dequeue().await {
        handle_job(ctx, job).await;
        handled += 1;
    }
    handled
}

/// Spawns a worker that consumes the persistence queue until aborted.
pub fn spawn_runner_task(ctx: Arc<SyncContext>) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting persistence task runner");
        while let Some(job) = ctx.queue.dequeue().await {
            handle_job(&ctx, job).await;
        }
        info!("Persistence queue closed, runner exiting");
    })
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CachePayload, DraftSlot, ListItemBundle, MessageBatch};
    use crate::config::Config;
    use crate::domain::{Ciphertext, SERVER_PREFIX, USER_PREFIX};
    use crate::entities::{Message, MessageRole};
    use chrono::Utc;
    use std::time::Duration;

    fn user_ct(body: &str) -> Ciphertext {
        Ciphertext::from_wire(format!("{USER_PREFIX}{body}"))
    }

    fn draft_task(chat_id: Uuid, owner: &OwnerId, version: u64) -> PersistTask {
        PersistTask::Draft {
            chat_id,
            owner_id: owner.clone(),
            content: Some(user_ct("draft")),
            version,
            edited_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_draft_job_persists_and_clears_cache() {
        let ctx = SyncContext::in_memory(Config::default());
        let chat_id = Uuid::new_v4();
        let owner = OwnerId::from_raw("alice");
        let key = CacheKey::list_item(owner.clone(), chat_id);

        ctx.cache
            .set(
                &key,
                CachePayload::ListItem(ListItemBundle {
                    encrypted_title: None,
                    draft: Some(DraftSlot {
                        content: Some(user_ct("draft")),
                        edited_at: Utc::now(),
                    }),
                    category: None,
                }),
                3,
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        let job = PersistJob::new(draft_task(chat_id, &owner, 3));
        let outcome = execute_job(&ctx, &job).await.unwrap();
        assert_eq!(outcome, PersistOutcome::Persisted);

        let draft = ctx.durable.get_draft(chat_id, &owner).await.unwrap().unwrap();
        assert_eq!(draft.version, 3);
        // Confirmed write, so the cache entry is gone.
        assert!(ctx.cache.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replayed_job_is_one_write_effect() {
        let ctx = SyncContext::in_memory(Config::default());
        let chat_id = Uuid::new_v4();
        let owner = OwnerId::from_raw("alice");

        let job = PersistJob::new(draft_task(chat_id, &owner, 2));
        assert_eq!(
            execute_job(&ctx, &job).await.unwrap(),
            PersistOutcome::Persisted
        );
        // At-least-once delivery replays the identical job.
        assert_eq!(
            execute_job(&ctx, &job).await.unwrap(),
            PersistOutcome::Superseded
        );

        let draft = ctx.durable.get_draft(chat_id, &owner).await.unwrap().unwrap();
        assert_eq!(draft.version, 2);
    }

    #[tokio::test]
    async fn test_message_job_inserts_then_bumps() {
        let ctx = SyncContext::in_memory(Config::default());
        let chat_id = Uuid::new_v4();
        let owner = OwnerId::from_raw("alice");
        let message = Message::new(chat_id, MessageRole::User, user_ct("hello"));

        let job = PersistJob::new(PersistTask::Message {
            chat_id,
            owner_id: owner.clone(),
            message: message.clone(),
            messages_version: 1,
        });
        assert_eq!(
            execute_job(&ctx, &job).await.unwrap(),
            PersistOutcome::Persisted
        );

        assert!(ctx.durable.has_message(message.message_id).await.unwrap());
        let chat = ctx.durable.get_chat(chat_id).await.unwrap().unwrap();
        assert_eq!(chat.messages_version, 1);
    }

    #[tokio::test]
    async fn test_server_domain_payload_is_rejected() {
        let ctx = SyncContext::in_memory(Config::default());
        let chat_id = Uuid::new_v4();
        let owner = OwnerId::from_raw("alice");

        let job = PersistJob::new(PersistTask::Draft {
            chat_id,
            owner_id: owner.clone(),
            content: Some(Ciphertext::from_wire(format!("{SERVER_PREFIX}AAAA"))),
            version: 1,
            edited_at: Utc::now(),
        });

        let result = execute_job(&ctx, &job).await;
        assert!(matches!(result, Err(SyncError::DomainViolation { .. })));
        assert_eq!(ctx.guard.violation_count().await, 1);
        // Nothing reached the durable store.
        assert!(ctx.durable.get_draft(chat_id, &owner).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_partial_bundle_keeps_cache_entry() {
        let ctx = SyncContext::in_memory(Config::default());
        let chat_id = Uuid::new_v4();
        let owner = OwnerId::from_raw("alice");
        let key = CacheKey::list_item(owner.clone(), chat_id);

        // Bundle carries both a title and a draft at version 2.
        ctx.cache
            .set(
                &key,
                CachePayload::ListItem(ListItemBundle {
                    encrypted_title: Some(user_ct("title")),
                    draft: Some(DraftSlot {
                        content: Some(user_ct("draft")),
                        edited_at: Utc::now(),
                    }),
                    category: None,
                }),
                2,
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        // Only the draft is persisted; the title has not caught up yet.
        let job = PersistJob::new(draft_task(chat_id, &owner, 2));
        execute_job(&ctx, &job).await.unwrap();

        assert!(
            ctx.cache.get(&key).await.unwrap().is_some(),
            "entry must survive until every sub-resource is durable"
        );
    }

    #[tokio::test]
    async fn test_drain_queue_processes_everything() {
        let ctx = SyncContext::in_memory(Config::default());
        let chat_id = Uuid::new_v4();
        let owner = OwnerId::from_raw("alice");

        ctx.queue.enqueue(draft_task(chat_id, &owner, 1)).await.unwrap();
        ctx.queue
            .enqueue(PersistTask::Message {
                chat_id,
                owner_id: owner.clone(),
                message: Message::new(chat_id, MessageRole::User, user_ct("m")),
                messages_version: 1,
            })
            .await
            .unwrap();

        assert_eq!(drain_queue(&ctx).await, 2);
        assert_eq!(ctx.queue.pending_count().await, 0);
    }
}
