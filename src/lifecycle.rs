//! Chat Lifecycle Manager
//!
//! Guarantees that a chat's durable record and server-side envelope key
//! exist before any sub-resource write. Creation is idempotent: concurrent
//! callers for the same chat converge on a single record.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::domain::EncryptionDomain;
use crate::durable::DurableStore;
use crate::entities::{ChatRecord, OwnerId};
use crate::error::{Result, SyncError};
use crate::keysvc::KeyService;

// == Chat Lifecycle Manager ==
/// Idempotent create-or-get for durable chat records.
pub struct ChatLifecycleManager {
    durable: Arc<dyn DurableStore>,
    keys: Arc<dyn KeyService>,
}

impl ChatLifecycleManager {
    /// Creates a manager over the given stores.
    pub fn new(durable: Arc<dyn DurableStore>, keys: Arc<dyn KeyService>) -> Self {
        Self { durable, keys }
    }

    /// Ensures the durable record for `chat_id` exists and returns it.
    ///
    /// On first write, a server-side envelope key is requested before the
    /// record is created; if key creation fails, the whole operation fails
    /// and no chat exists. A duplicate-key error on insert means another
    /// writer won the race and is treated as success.
    pub async fn ensure_chat_exists(
        &self,
        chat_id: Uuid,
        owner_id: &OwnerId,
    ) -> Result<ChatRecord> {
        if let Some(existing) = self.durable.get_chat(chat_id).await? {
            return Ok(existing);
        }

        // Key first: a chat without a key reference could never support
        // AI-processing ciphertext, so it must never exist.
        let key_reference = self
            .keys
            .create_key(&chat_id.to_string(), EncryptionDomain::Server)
            .await?;

        let record = ChatRecord::new(chat_id, owner_id.clone(), key_reference);
        match self.durable.insert_chat(record.clone()).await {
            Ok(()) => {
                info!(%chat_id, "durable chat record created");
                Ok(record)
            }
            Err(SyncError::DuplicateChat(_)) => self
                .durable
                .get_chat(chat_id)
                .await?
                .ok_or_else(|| SyncError::Internal(format!("chat {chat_id} vanished after race"))),
            Err(err) => Err(err),
        }
    }
}
