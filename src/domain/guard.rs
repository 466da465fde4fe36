//! Encryption Domain Guard
//!
//! Validates ciphertext provenance before anything is cached or persisted,
//! and sweeps both storage tiers for contamination. Detected violations are
//! logged as CRITICAL integrity events and recorded for the operator-facing
//! diagnostic report. The guard never rewrites misclassified ciphertext;
//! silent repair would mask the root cause.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::error;

use crate::cache::{CacheStore, KeyPattern};
use crate::domain::{Ciphertext, EncryptionDomain, Provenance};
use crate::durable::DurableStore;
use crate::error::{Result, SyncError};

/// Number of violation events retained for the diagnostic report.
const RECENT_EVENT_LIMIT: usize = 64;

// == Violation Event ==
/// A single detected domain violation.
#[derive(Debug, Clone, Serialize)]
pub struct ViolationEvent {
    /// Where the ciphertext was found (cache key or durable location)
    pub location: String,
    /// Domain the tier requires
    pub expected: EncryptionDomain,
    /// Provenance actually observed
    pub found: Provenance,
    /// Detection timestamp
    pub detected_at: DateTime<Utc>,
}

// == Integrity Report ==
/// Outcome of a full tier sweep.
#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    /// Durable messages inspected
    pub durable_messages_scanned: usize,
    /// Cache keys inspected
    pub cache_keys_scanned: usize,
    /// Violations found by this sweep
    pub violations_found: usize,
}

// == Domain Guard ==
/// Classifies ciphertext and enforces the tier/domain mapping.
#[derive(Debug, Default)]
pub struct DomainGuard {
    total: RwLock<u64>,
    recent: RwLock<Vec<ViolationEvent>>,
}

impl DomainGuard {
    /// Creates a guard with an empty violation ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Asserts that `ciphertext` carries the domain `expected` for the tier
    /// identified by `location`.
    ///
    /// On mismatch the violation is recorded and returned as an error; the
    /// ciphertext itself is left untouched.
    pub async fn assert_domain(
        &self,
        ciphertext: &Ciphertext,
        expected: EncryptionDomain,
        location: &str,
    ) -> Result<()> {
        let found = ciphertext.provenance();
        if found == expected.provenance() {
            return Ok(());
        }

        self.record_violation(location, expected, found).await;
        Err(SyncError::DomainViolation {
            location: location.to_string(),
            expected,
            found,
        })
    }

    /// Records a violation without producing an error.
    ///
    /// Used by the integrity sweep, which inspects data in place rather than
    /// gating a write.
    pub async fn record_violation(
        &self,
        location: &str,
        expected: EncryptionDomain,
        found: Provenance,
    ) {
        error!(
            integrity = "CRITICAL",
            location, %expected, %found,
            "encryption domain violation detected"
        );

        *self.total.write().await += 1;

        let mut recent = self.recent.write().await;
        if recent.len() >= RECENT_EVENT_LIMIT {
            recent.remove(0);
        }
        recent.push(ViolationEvent {
            location: location.to_string(),
            expected,
            found,
            detected_at: Utc::now(),
        });
    }

    /// Total violations detected since startup.
    pub async fn violation_count(&self) -> u64 {
        *self.total.read().await
    }

    /// Most recent violation events, oldest first.
    pub async fn recent_violations(&self) -> Vec<ViolationEvent> {
        self.recent.read().await.clone()
    }

    /// Sweeps the durable store and both cache tiers for ciphertext in the
    /// wrong domain.
    ///
    /// Violations are recorded and counted; the offending data is left
    /// byte-for-byte intact for root-cause analysis.
    pub async fn integrity_scan(
        &self,
        cache: &dyn CacheStore,
        durable: &dyn DurableStore,
        batch_limit: usize,
    ) -> Result<IntegrityReport> {
        let mut violations = 0usize;

        // Durable store: user domain only.
        let messages = durable.scan_messages(batch_limit).await?;
        let durable_scanned = messages.len();
        for message in &messages {
            let found = message.encrypted_content.provenance();
            if found != Provenance::User {
                let location = format!("durable:messages:{}", message.message_id);
                self.record_violation(&location, EncryptionDomain::User, found)
                    .await;
                violations += 1;
            }
        }

        // Cache tiers: sync and list-item keys are user domain, the AI key
        // is server domain.
        let mut cache_scanned = 0usize;
        for (pattern, expected) in [
            (KeyPattern::ListItems, EncryptionDomain::User),
            (KeyPattern::SyncMessages, EncryptionDomain::User),
            (KeyPattern::AiMessages, EncryptionDomain::Server),
        ] {
            for key in cache.scan_keys(pattern, batch_limit).await? {
                let Some(entry) = cache.get(&key).await? else {
                    continue;
                };
                cache_scanned += 1;
                let location = key.to_string();
                for ciphertext in entry.payload.ciphertexts() {
                    let found = ciphertext.provenance();
                    if found != expected.provenance() {
                        self.record_violation(&location, expected, found).await;
                        violations += 1;
                    }
                }
            }
        }

        Ok(IntegrityReport {
            durable_messages_scanned: durable_scanned,
            cache_keys_scanned: cache_scanned,
            violations_found: violations,
        })
    }
}
