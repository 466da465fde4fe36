//! Durable Store Trait
//!
//! The system of record survives cache eviction and process restarts. All
//! version-guarded writes are strictly-greater: an equal or lower incoming
//! version is a duplicate dispatch and a benign no-op, never an error.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::Ciphertext;
use crate::entities::{ChatRecord, Draft, Message, OwnerId};
use crate::error::Result;

// == Durable Store ==
/// Document store holding chats, messages, and drafts.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Fetches a chat record.
    async fn get_chat(&self, chat_id: Uuid) -> Result<Option<ChatRecord>>;

    /// Inserts a fresh chat record.
    ///
    /// Fails with `SyncError::DuplicateChat` if the record already exists;
    /// callers treat that as success-by-another-writer.
    async fn insert_chat(&self, record: ChatRecord) -> Result<()>;

    /// Writes the title if `version` is strictly greater than the stored
    /// `title_version`. Returns whether a write happened.
    async fn update_title(
        &self,
        chat_id: Uuid,
        encrypted_title: Ciphertext,
        version: u64,
        edited_at: DateTime<Utc>,
    ) -> Result<bool>;

    /// Inserts a message, idempotent on `message_id`. Returns whether the
    /// message was newly written.
    async fn insert_message(&self, message: Message) -> Result<bool>;

    /// Whether a message is already durable.
    async fn has_message(&self, message_id: Uuid) -> Result<bool>;

    /// Raises `messages_version` to `version` if it is strictly greater.
    /// Returns whether a write happened.
    async fn set_messages_version(
        &self,
        chat_id: Uuid,
        version: u64,
        edited_at: DateTime<Utc>,
    ) -> Result<bool>;

    /// Fetches a draft by its composite key.
    async fn get_draft(&self, chat_id: Uuid, owner_id: &OwnerId) -> Result<Option<Draft>>;

    /// Creates or updates a draft if `draft.version` is strictly greater
    /// than the stored version. Returns whether a write happened.
    ///
    /// `encrypted_content = None` records an explicitly cleared draft; a
    /// durable draft is never removed by version comparison.
    async fn upsert_draft(&self, draft: Draft) -> Result<bool>;

    /// Enumerates durable messages for the integrity sweep, bounded by
    /// `limit`.
    async fn scan_messages(&self, limit: usize) -> Result<Vec<Message>>;
}
