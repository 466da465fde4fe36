//! Request DTOs for the sync engine API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;
use uuid::Uuid;

/// Maximum accepted raw user identifier length.
const MAX_USER_ID_LENGTH: usize = 256;

/// Request body for POST /chats/ensure
///
/// # Fields
/// - `chat_id`: The chat to ensure a durable record for
/// - `user_id`: Raw user identifier; hashed before any storage or logging
#[derive(Debug, Clone, Deserialize)]
pub struct EnsureChatRequest {
    /// The chat id
    pub chat_id: Uuid,
    /// Raw user identifier
    pub user_id: String,
}

impl EnsureChatRequest {
    /// Validates the request data.
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        validate_user_id(&self.user_id)
    }
}

/// Request body for POST /logout/flush
#[derive(Debug, Clone, Deserialize)]
pub struct FlushDraftRequest {
    /// The chat whose draft should be flushed
    pub chat_id: Uuid,
    /// Raw user identifier of the session owner
    pub user_id: String,
}

impl FlushDraftRequest {
    /// Validates the request data.
    pub fn validate(&self) -> Option<String> {
        validate_user_id(&self.user_id)
    }
}

fn validate_user_id(user_id: &str) -> Option<String> {
    if user_id.is_empty() {
        return Some("user_id cannot be empty".to_string());
    }
    if user_id.len() > MAX_USER_ID_LENGTH {
        return Some(format!(
            "user_id exceeds maximum length of {MAX_USER_ID_LENGTH} characters"
        ));
    }
    None
}
