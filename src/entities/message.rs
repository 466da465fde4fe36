//! Message Entity
//!
//! Messages are created once by the processing pipeline, written to cache
//! immediately, persisted durably exactly once, and never mutated after
//! persistence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Ciphertext;

// == Message Role ==
/// Author role of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

// == Message ==
/// A single chat message.
///
/// `encrypted_content` is user-key domain when persisted; server-key domain
/// ciphertext exists transiently under the AI cache key only and never
/// reaches the durable store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique id; durable insert is idempotent on this key
    pub message_id: Uuid,
    /// Owning chat
    pub chat_id: Uuid,
    /// Author role
    pub role: MessageRole,
    /// Content ciphertext
    pub encrypted_content: Ciphertext,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Creates a message with a fresh id and the current timestamp.
    pub fn new(chat_id: Uuid, role: MessageRole, encrypted_content: Ciphertext) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            chat_id,
            role,
            encrypted_content,
            created_at: Utc::now(),
        }
    }
}
