//! In-Memory Durable Backend
//!
//! Process-local stand-in for the external document store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::Ciphertext;
use crate::durable::DurableStore;
use crate::entities::{ChatRecord, Draft, Message, OwnerId};
use crate::error::{Result, SyncError};

#[derive(Debug, Default)]
struct DurableInner {
    chats: HashMap<Uuid, ChatRecord>,
    messages: HashMap<Uuid, Message>,
    drafts: HashMap<(Uuid, OwnerId), Draft>,
}

// == Memory Durable Store ==
/// In-memory `DurableStore` backend.
#[derive(Debug, Default)]
pub struct MemoryDurableStore {
    inner: RwLock<DurableInner>,
}

impl MemoryDurableStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of durable messages (test visibility).
    pub async fn message_count(&self) -> usize {
        self.inner.read().await.messages.len()
    }
}

#[async_trait]
impl DurableStore for MemoryDurableStore {
    async fn get_chat(&self, chat_id: Uuid) -> Result<Option<ChatRecord>> {
        Ok(self.inner.read().await.chats.get(&chat_id).cloned())
    }

    async fn insert_chat(&self, record: ChatRecord) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.chats.contains_key(&record.chat_id) {
            return Err(SyncError::DuplicateChat(record.chat_id));
        }
        inner.chats.insert(record.chat_id, record);
        Ok(())
    }

    async fn update_title(
        &self,
        chat_id: Uuid,
        encrypted_title: Ciphertext,
        version: u64,
        edited_at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let chat = inner
            .chats
            .get_mut(&chat_id)
            .ok_or_else(|| SyncError::NotFound(format!("chat {chat_id}")))?;

        if version <= chat.title_version {
            return Ok(false);
        }
        chat.encrypted_title = Some(encrypted_title);
        chat.title_version = version;
        chat.last_edited = edited_at;
        Ok(true)
    }

    async fn insert_message(&self, message: Message) -> Result<bool> {
        let mut inner = self.inner.write().await;
        if inner.messages.contains_key(&message.message_id) {
            return Ok(false);
        }
        inner.messages.insert(message.message_id, message);
        Ok(true)
    }

    async fn has_message(&self, message_id: Uuid) -> Result<bool> {
        Ok(self.inner.read().await.messages.contains_key(&message_id))
    }

    async fn set_messages_version(
        &self,
        chat_id: Uuid,
        version: u64,
        edited_at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let chat = inner
            .chats
            .get_mut(&chat_id)
            .ok_or_else(|| SyncError::NotFound(format!("chat {chat_id}")))?;

        if version <= chat.messages_version {
            return Ok(false);
        }
        chat.messages_version = version;
        chat.last_edited = edited_at;
        Ok(true)
    }

    async fn get_draft(&self, chat_id: Uuid, owner_id: &OwnerId) -> Result<Option<Draft>> {
        Ok(self
            .inner
            .read()
            .await
            .drafts
            .get(&(chat_id, owner_id.clone()))
            .cloned())
    }

    async fn upsert_draft(&self, draft: Draft) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let key = (draft.chat_id, draft.owner_id.clone());

        if let Some(existing) = inner.drafts.get(&key) {
            if draft.version <= existing.version {
                return Ok(false);
            }
        }
        inner.drafts.insert(key, draft);
        Ok(true)
    }

    async fn scan_messages(&self, limit: usize) -> Result<Vec<Message>> {
        Ok(self
            .inner
            .read()
            .await
            .messages
            .values()
            .take(limit)
            .cloned()
            .collect())
    }
}
