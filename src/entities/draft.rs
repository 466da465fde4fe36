//! Draft Entity
//!
//! Drafts live primarily in the cache; the durable copy is a write-back
//! shadow whose version never exceeds the cache copy's at the moment of
//! write. `encrypted_content = None` records an explicitly cleared draft.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Ciphertext;
use crate::entities::OwnerId;

// == Draft ==
/// Durable draft row, keyed by `(chat_id, owner_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Draft {
    /// Owning chat
    pub chat_id: Uuid,
    /// Hashed owner identifier
    pub owner_id: OwnerId,
    /// Draft ciphertext, user-key domain; None = cleared draft
    pub encrypted_content: Option<Ciphertext>,
    /// Last persisted version for this (owner, chat) pair
    pub version: u64,
    /// Timestamp of the edit this version captured
    pub last_edited: DateTime<Utc>,
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::USER_PREFIX;

    #[test]
    fn test_cleared_draft_serde() {
        let draft = Draft {
            chat_id: Uuid::new_v4(),
            owner_id: OwnerId::from_raw("alice"),
            encrypted_content: None,
            version: 4,
            last_edited: Utc::now(),
        };

        let json = serde_json::to_string(&draft).unwrap();
        let back: Draft = serde_json::from_str(&json).unwrap();
        assert!(back.encrypted_content.is_none());
        assert_eq!(back.version, 4);
    }

    #[test]
    fn test_draft_serde_round_trip() {
        let draft = Draft {
            chat_id: Uuid::new_v4(),
            owner_id: OwnerId::from_raw("alice"),
            encrypted_content: Some(Ciphertext::from_wire(format!("{}AAAA", USER_PREFIX))),
            version: 2,
            last_edited: Utc::now(),
        };

        let json = serde_json::to_string(&draft).unwrap();
        let back: Draft = serde_json::from_str(&json).unwrap();
        assert_eq!(back.encrypted_content, draft.encrypted_content);
    }
}
