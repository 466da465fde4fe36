//! Cache Key Contract
//!
//! Typed forms of the stable key-naming contract:
//!
//! - `user:{owner}:chat:{chat}:list_item_data` — title/draft/category bundle
//! - `chat:{chat}:messages:ai` — AI-processing tier, server-key domain
//! - `chat:{chat}:messages:sync` — user-facing tier, user-key domain
//!
//! The two messages keys are physically distinct on purpose: one key per
//! encryption domain, never shared.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::OwnerId;
use crate::error::SyncError;

// == Message Tier ==
/// Which encryption domain a messages key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageTier {
    /// AI-processing cache, server-key domain, never persisted
    Ai,
    /// User-facing sync cache, user-key domain
    Sync,
}

impl fmt::Display for MessageTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageTier::Ai => write!(f, "ai"),
            MessageTier::Sync => write!(f, "sync"),
        }
    }
}

// == Cache Key ==
/// A typed cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CacheKey {
    /// `user:{owner}:chat:{chat}:list_item_data`
    ListItem { owner_id: OwnerId, chat_id: Uuid },
    /// `chat:{chat}:messages:{tier}`
    Messages { chat_id: Uuid, tier: MessageTier },
}

impl CacheKey {
    /// Builds the list-item bundle key for an (owner, chat) pair.
    pub fn list_item(owner_id: OwnerId, chat_id: Uuid) -> Self {
        Self::ListItem { owner_id, chat_id }
    }

    /// Builds a messages key for the given tier.
    pub fn messages(chat_id: Uuid, tier: MessageTier) -> Self {
        Self::Messages { chat_id, tier }
    }

    /// The chat this key belongs to.
    pub fn chat_id(&self) -> Uuid {
        match self {
            CacheKey::ListItem { chat_id, .. } => *chat_id,
            CacheKey::Messages { chat_id, .. } => *chat_id,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::ListItem { owner_id, chat_id } => {
                write!(f, "user:{owner_id}:chat:{chat_id}:list_item_data")
            }
            CacheKey::Messages { chat_id, tier } => {
                write!(f, "chat:{chat_id}:messages:{tier}")
            }
        }
    }
}

impl FromStr for CacheKey {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || SyncError::InvalidRequest(format!("malformed cache key: {s}"));

        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            ["user", owner, "chat", chat, "list_item_data"] => Ok(CacheKey::ListItem {
                owner_id: owner.parse()?,
                chat_id: chat.parse().map_err(|_| malformed())?,
            }),
            ["chat", chat, "messages", tier] => {
                let tier = match *tier {
                    "ai" => MessageTier::Ai,
                    "sync" => MessageTier::Sync,
                    _ => return Err(malformed()),
                };
                Ok(CacheKey::Messages {
                    chat_id: chat.parse().map_err(|_| malformed())?,
                    tier,
                })
            }
            _ => Err(malformed()),
        }
    }
}

// == Key Pattern ==
/// Key families addressable by pattern scan.
///
/// The reconciler scans only `ListItems` and `SyncMessages`; the AI tier is
/// swept by the integrity scan but never dispatched toward the durable store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPattern {
    /// All `user:*:chat:*:list_item_data` keys
    ListItems,
    /// All `chat:*:messages:sync` keys
    SyncMessages,
    /// All `chat:*:messages:ai` keys
    AiMessages,
}

impl KeyPattern {
    /// Whether a key belongs to this family.
    pub fn matches(&self, key: &CacheKey) -> bool {
        match (self, key) {
            (KeyPattern::ListItems, CacheKey::ListItem { .. }) => true,
            (
                KeyPattern::SyncMessages,
                CacheKey::Messages {
                    tier: MessageTier::Sync,
                    ..
                },
            ) => true,
            (
                KeyPattern::AiMessages,
                CacheKey::Messages {
                    tier: MessageTier::Ai,
                    ..
                },
            ) => true,
            _ => false,
        }
    }
}
