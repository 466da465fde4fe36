//! Cache Entry Module
//!
//! Defines the versioned, TTL-bounded cache entry.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::cache::CachePayload;

// == Versioned Entry ==
/// A cache entry wrapping a payload with its version and expiry.
///
/// Every entry is TTL-bounded; the reconciler must persist anything newer
/// than the durable store before `expires_at` is reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionedEntry {
    /// The cached payload
    pub payload: CachePayload,
    /// Monotonic version at the time of the write
    pub version: u64,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
}

impl VersionedEntry {
    // == Constructor ==
    /// Creates a new entry expiring `ttl` from now.
    pub fn new(payload: CachePayload, version: u64, ttl: Duration) -> Self {
        let now = current_timestamp_ms();
        Self {
            payload,
            version,
            created_at: now,
            expires_at: now + ttl.as_millis() as u64,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry is expired when the current time is
    /// greater than or equal to the expiration time.
    pub fn is_expired(&self) -> bool {
        current_timestamp_ms() >= self.expires_at
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds (0 once expired).
    pub fn ttl_remaining_ms(&self) -> u64 {
        let now = current_timestamp_ms();
        self.expires_at.saturating_sub(now)
    }

    /// Returns remaining TTL in seconds (0 once expired).
    pub fn ttl_remaining(&self) -> u64 {
        self.ttl_remaining_ms() / 1000
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}
