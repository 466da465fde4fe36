//! Chat Record
//!
//! The durable system-of-record row for a chat.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Ciphertext;
use crate::entities::OwnerId;
use crate::keysvc::KeyReference;

// == Chat Record ==
/// Durable record for a single chat.
///
/// `server_key_reference` is created exactly once, at first write, and is
/// immutable thereafter; no chat exists without it. `owner_id` is likewise
/// immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRecord {
    /// Primary key
    pub chat_id: Uuid,
    /// Hashed owner identifier
    pub owner_id: OwnerId,
    /// Title ciphertext, user-key domain
    pub encrypted_title: Option<Ciphertext>,
    /// Last persisted title version
    pub title_version: u64,
    /// Last persisted messages version
    pub messages_version: u64,
    /// Most recent edit across all sub-resources
    pub last_edited: DateTime<Utc>,
    /// Opaque handle to the server-side envelope key, never key material
    pub server_key_reference: KeyReference,
}

impl ChatRecord {
    /// Creates a fresh record with all versions at zero.
    pub fn new(chat_id: Uuid, owner_id: OwnerId, server_key_reference: KeyReference) -> Self {
        Self {
            chat_id,
            owner_id,
            encrypted_title: None,
            title_version: 0,
            messages_version: 0,
            last_edited: Utc::now(),
            server_key_reference,
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EncryptionDomain;

    #[test]
    fn test_new_record_starts_at_version_zero() {
        let key_ref = KeyReference::new(EncryptionDomain::Server);
        let record = ChatRecord::new(Uuid::new_v4(), OwnerId::from_raw("alice"), key_ref);

        assert_eq!(record.title_version, 0);
        assert_eq!(record.messages_version, 0);
        assert!(record.encrypted_title.is_none());
    }

    #[test]
    fn test_record_serde_round_trip() {
        let key_ref = KeyReference::new(EncryptionDomain::Server);
        let record = ChatRecord::new(Uuid::new_v4(), OwnerId::from_raw("alice"), key_ref);

        let json = serde_json::to_string(&record).unwrap();
        let back: ChatRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.chat_id, record.chat_id);
        assert_eq!(back.owner_id, record.owner_id);
    }
}
