//! Logout Flush Path
//!
//! Synchronous variant of the reconciler invoked at session end. The caller
//! awaits it, bounded by a timeout; a flush that cannot confirm persistence
//! leaves the cache entry in place for the scheduled reconciler, so logout
//! never hangs and the draft is never lost.

use tokio::time::timeout;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::{CacheKey, CacheStore};
use crate::context::SyncContext;
use crate::domain::EncryptionDomain;
use crate::durable::DurableStore;
use crate::entities::{Draft, OwnerId};
use crate::error::{Result, SyncError};
use crate::tasks::maybe_clear_list_item;

// == Flush Outcome ==
/// Result of a logout flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// A newer draft was persisted and the cache entry handled
    Flushed,
    /// Nothing needed persisting
    Clean,
    /// Persistence could not be confirmed in time; the entry stays cached
    /// for the next reconciler pass
    Deferred,
}

/// Flushes a pending draft when a session ends.
///
/// Steps, strictly ordered once a cached draft is found: ensure the durable
/// chat exists, persist the draft if its version is newer, and only on
/// confirmed persistence delete the cache entry.
pub async fn flush_draft_on_logout(
    ctx: &SyncContext,
    owner_id: &OwnerId,
    chat_id: Uuid,
) -> Result<FlushOutcome> {
    match timeout(
        ctx.config.flush_timeout(),
        flush_inner(ctx, owner_id, chat_id),
    )
    .await
    {
        Ok(Ok(outcome)) => Ok(outcome),
        Ok(Err(err)) => match err {
            // Recoverable: the reconciler retries from the surviving cache
            // entry. Logout itself must complete.
            SyncError::TransientStore(_) | SyncError::EncryptionService(_) => {
                warn!(%chat_id, error = %err, "logout flush failed, deferring to reconciler");
                Ok(FlushOutcome::Deferred)
            }
            other => Err(other),
        },
        Err(_elapsed) => {
            warn!(%chat_id, "logout flush timed out, deferring to reconciler");
            Ok(FlushOutcome::Deferred)
        }
    }
}

async fn flush_inner(
    ctx: &SyncContext,
    owner_id: &OwnerId,
    chat_id: Uuid,
) -> Result<FlushOutcome> {
    let key = CacheKey::list_item(owner_id.clone(), chat_id);
    let Some(entry) = ctx.cache.get(&key).await? else {
        return Ok(FlushOutcome::Clean);
    };
    let Some(bundle) = entry.payload.as_list_item() else {
        return Ok(FlushOutcome::Clean);
    };
    let Some(slot) = &bundle.draft else {
        return Ok(FlushOutcome::Clean);
    };

    // Step 1: the durable record (and its key reference) must exist first.
    ctx.lifecycle.ensure_chat_exists(chat_id, owner_id).await?;

    // Step 2: persist only if the cached draft is newer.
    let durable_version = ctx
        .durable
        .get_draft(chat_id, owner_id)
        .await?
        .map(|d| d.version)
        .unwrap_or(0);
    if entry.version <= durable_version {
        debug!(%chat_id, version = entry.version, "draft already reconciled");
        maybe_clear_list_item(ctx, owner_id, chat_id).await?;
        return Ok(FlushOutcome::Clean);
    }

    if let Some(content) = &slot.content {
        ctx.guard
            .assert_domain(
                content,
                EncryptionDomain::User,
                &format!("durable:drafts:{chat_id}"),
            )
            .await?;
    }

    let written = ctx
        .durable
        .upsert_draft(Draft {
            chat_id,
            owner_id: owner_id.clone(),
            encrypted_content: slot.content.clone(),
            version: entry.version,
            last_edited: slot.edited_at,
        })
        .await?;

    // Step 3: delete the cache entry only after confirmed persistence.
    if written {
        maybe_clear_list_item(ctx, owner_id, chat_id).await?;
        debug!(%chat_id, version = entry.version, "draft flushed on logout");
        Ok(FlushOutcome::Flushed)
    } else {
        // Raced with a runner that persisted the same version.
        Ok(FlushOutcome::Clean)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CachePayload, DraftSlot, ListItemBundle};
    use crate::config::Config;
    use crate::domain::{Ciphertext, USER_PREFIX};
    use chrono::Utc;
    use std::time::Duration;

    fn user_ct(body: &str) -> Ciphertext {
        Ciphertext::from_wire(format!("{USER_PREFIX}{body}"))
    }

    fn draft_payload(content: &str) -> CachePayload {
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
    async fn test_flush_persists_newer_draft() {
        let ctx = SyncContext::in_memory(Config::default());
        let chat_id = Uuid::new_v4();
        let owner = OwnerId::from_raw("alice");
        let key = CacheKey::list_item(owner.clone(), chat_id);

        ctx.cache
            .set(&key, draft_payload("draft"), 2, Duration::from_secs(60))
            .await
            .unwrap();

        let outcome = flush_draft_on_logout(&ctx, &owner, chat_id).await.unwrap();
        assert_eq!(outcome, FlushOutcome::Flushed);

        let draft = ctx.durable.get_draft(chat_id, &owner).await.unwrap().unwrap();
        assert_eq!(draft.version, 2);
        assert!(ctx.cache.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_flush_without_cached_draft_is_clean() {
        let ctx = SyncContext::in_memory(Config::default());
        let chat_id = Uuid::new_v4();
        let owner = OwnerId::from_raw("alice");

        let outcome = flush_draft_on_logout(&ctx, &owner, chat_id).await.unwrap();
        assert_eq!(outcome, FlushOutcome::Clean);
        // No cached draft means no reason to create a durable chat.
        assert!(ctx.durable.get_chat(chat_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_flush_creates_chat_for_first_draft() {
        let ctx = SyncContext::in_memory(Config::default());
        let chat_id = Uuid::new_v4();
        let owner = OwnerId::from_raw("alice");
        let key = CacheKey::list_item(owner.clone(), chat_id);

        ctx.cache
            .set(&key, draft_payload("first"), 1, Duration::from_secs(60))
            .await
            .unwrap();

        assert!(ctx.durable.get_chat(chat_id).await.unwrap().is_none());
        let outcome = flush_draft_on_logout(&ctx, &owner, chat_id).await.unwrap();
        assert_eq!(outcome, FlushOutcome::Flushed);

        // ensure_chat_exists ran first: record and key reference exist.
        assert!(ctx.durable.get_chat(chat_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_flush_skips_already_reconciled_draft() {
        let ctx = SyncContext::in_memory(Config::default());
        let chat_id = Uuid::new_v4();
        let owner = OwnerId::from_raw("alice");
        let key = CacheKey::list_item(owner.clone(), chat_id);

        ctx.lifecycle.ensure_chat_exists(chat_id, &owner).await.unwrap();
        ctx.durable
            .upsert_draft(Draft {
                chat_id,
                owner_id: owner.clone(),
                encrypted_content: Some(user_ct("same")),
                version: 2,
                last_edited: Utc::now(),
            })
            .await
            .unwrap();

        ctx.cache
            .set(&key, draft_payload("same"), 2, Duration::from_secs(60))
            .await
            .unwrap();

        let outcome = flush_draft_on_logout(&ctx, &owner, chat_id).await.unwrap();
        assert_eq!(outcome, FlushOutcome::Clean);
    }
}
