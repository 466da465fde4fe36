//! Cache Payloads
//!
//! Tagged payload types for the two key families. The list-item bundle
//! shares its key's single version counter; the durable side records the
//! last-persisted version per sub-resource.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Ciphertext;
use crate::entities::{Message, OwnerId};

// == Draft Slot ==
/// Draft state inside a list-item bundle.
///
/// A slot with `content = None` is an explicitly cleared draft that still
/// needs persisting; a bundle without a slot carries no draft edit at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftSlot {
    /// Draft ciphertext, user-key domain; None = cleared
    pub content: Option<Ciphertext>,
    /// Timestamp of the last draft edit
    pub edited_at: DateTime<Utc>,
}

// == List Item Bundle ==
/// Title/draft/category bundle stored under the list-item key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListItemBundle {
    /// Title ciphertext, user-key domain
    pub encrypted_title: Option<Ciphertext>,
    /// Draft state, if any draft edit is pending
    pub draft: Option<DraftSlot>,
    /// Client-side list category; cache-only, never persisted
    pub category: Option<String>,
}

impl ListItemBundle {
    /// Whether the bundle carries a title to persist.
    pub fn has_title(&self) -> bool {
        self.encrypted_title.is_some()
    }

    /// Whether the bundle carries a draft edit (including a clear).
    pub fn has_draft(&self) -> bool {
        self.draft.is_some()
    }
}

// == Message Batch ==
/// Ordered message list stored under a messages key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageBatch {
    /// Hashed owner of the chat; lets the reconciler ensure the durable
    /// record exists before dispatching
    pub owner_id: OwnerId,
    /// Messages in creation order
    pub messages: Vec<Message>,
}

// == Cache Payload ==
/// All payload shapes the cache can hold.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CachePayload {
    ListItem(ListItemBundle),
    Messages(MessageBatch),
}

impl CachePayload {
    /// Borrows the list-item bundle if this payload is one.
    pub fn as_list_item(&self) -> Option<&ListItemBundle> {
        match self {
            CachePayload::ListItem(bundle) => Some(bundle),
            _ => None,
        }
    }

    /// Borrows the message batch if this payload is one.
    pub fn as_messages(&self) -> Option<&MessageBatch> {
        match self {
            CachePayload::Messages(batch) => Some(batch),
            _ => None,
        }
    }

    /// All ciphertexts carried by this payload, for integrity sweeps.
    pub fn ciphertexts(&self) -> Vec<&Ciphertext> {
        match self {
            CachePayload::ListItem(bundle) => {
                let mut out = Vec::new();
                if let Some(title) = &bundle.encrypted_title {
                    out.push(title);
                }
                if let Some(slot) = &bundle.draft {
                    if let Some(content) = &slot.content {
                        out.push(content);
                    }
                }
                out
            }
            CachePayload::Messages(batch) => batch
                .messages
                .iter()
                .map(|m| &m.encrypted_content)
                .collect(),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::USER_PREFIX;
    use crate::entities::MessageRole;
    use uuid::Uuid;

    fn user_ct(body: &str) -> Ciphertext {
        Ciphertext::from_wire(format!("{USER_PREFIX}{body}"))
    }

    #[test]
    fn test_bundle_flags() {
        let mut bundle = ListItemBundle::default();
        assert!(!bundle.has_title());
        assert!(!bundle.has_draft());

        bundle.encrypted_title = Some(user_ct("title"));
        bundle.draft = Some(DraftSlot {
            content: None,
            edited_at: Utc::now(),
        });
        assert!(bundle.has_title());
        // A cleared draft is still a pending draft edit.
        assert!(bundle.has_draft());
    }

    #[test]
    fn test_payload_tagged_serde() {
        let payload = CachePayload::ListItem(ListItemBundle {
            encrypted_title: Some(user_ct("title")),
            draft: None,
            category: Some("work".to_string()),
        });

        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"kind\":\"list_item\""));

        let back: CachePayload = serde_json::from_str(&json).unwrap();
        assert!(back.as_list_item().is_some());
        assert!(back.as_messages().is_none());
    }

    #[test]
    fn test_ciphertext_enumeration() {
        let chat_id = Uuid::new_v4();
        let payload = CachePayload::Messages(MessageBatch {
            owner_id: OwnerId::from_raw("alice"),
            messages: vec![
                Message::new(chat_id, MessageRole::User, user_ct("one")),
                Message::new(chat_id, MessageRole::Assistant, user_ct("two")),
            ],
        });
        assert_eq!(payload.ciphertexts().len(), 2);

        let bundle = CachePayload::ListItem(ListItemBundle {
            encrypted_title: Some(user_ct("title")),
            draft: Some(DraftSlot {
                content: Some(user_ct("draft")),
                edited_at: Utc::now(),
            }),
            category: None,
        });
        assert_eq!(bundle.ciphertexts().len(), 2);
    }
}
