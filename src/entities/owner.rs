//! Owner Identifier
//!
//! Owners are addressed by a SHA-256 digest of the raw user identifier.
//! Raw identifiers never appear in cache keys, durable records, or logs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::SyncError;

// == Owner Id ==
/// Hex-encoded SHA-256 digest of a user identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    /// Hashes a raw user identifier into an owner id.
    pub fn from_raw(raw: &str) -> Self {
        let digest = Sha256::digest(raw.as_bytes());
        Self(hex::encode(digest))
    }

    /// The hex digest as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OwnerId {
    type Err = SyncError;

    /// Parses an already-hashed owner id (64 lowercase hex characters), as
    /// found in cache keys.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(Self(s.to_ascii_lowercase()))
        } else {
            Err(SyncError::InvalidRequest(format!(
                "malformed owner id: {s}"
            )))
        }
    }
}
