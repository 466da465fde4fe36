//! In-Memory Envelope Key Backend
//!
//! AES-256-GCM implementation of the key service for local runs and tests.
//! Key bytes live inside this struct and are never returned to callers.

use std::collections::HashMap;

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{Ciphertext, EncryptionDomain};
use crate::error::{Result, SyncError};
use crate::keysvc::{KeyReference, KeyService};

/// AES-GCM nonce length in bytes.
const NONCE_LEN: usize = 12;

// == Envelope Key Service ==
/// In-memory `KeyService` backend.
#[derive(Default)]
pub struct EnvelopeKeyService {
    keys: RwLock<HashMap<Uuid, Key<Aes256Gcm>>>,
}

impl EnvelopeKeyService {
    /// Creates a service with no keys.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyService for EnvelopeKeyService {
    async fn create_key(&self, scope: &str, domain: EncryptionDomain) -> Result<KeyReference> {
        let reference = KeyReference::new(domain);
        let key = Aes256Gcm::generate_key(&mut OsRng);

        self.keys.write().await.insert(reference.key_id, key);
        debug!(%scope, key_id = %reference.key_id, %domain, "envelope key created");
        Ok(reference)
    }

    async fn encrypt(&self, plaintext: &[u8], key_ref: &KeyReference) -> Result<Ciphertext> {
        let keys = self.keys.read().await;
        let key = keys.get(&key_ref.key_id).ok_or_else(|| {
            SyncError::EncryptionService(format!("unknown key reference {}", key_ref.key_id))
        })?;

        let cipher = Aes256Gcm::new(key);
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| SyncError::EncryptionService("encryption failed".to_string()))?;

        let mut body = nonce.to_vec();
        body.extend_from_slice(&sealed);
        Ok(Ciphertext::from_wire(format!(
            "{}{}",
            key_ref.domain.prefix(),
            BASE64.encode(body)
        )))
    }

    async fn decrypt(&self, ciphertext: &Ciphertext, key_ref: &KeyReference) -> Result<Vec<u8>> {
        // Domain mismatch is a violation, reported before any key is touched.
        let found = ciphertext.provenance();
        if found != key_ref.domain.provenance() {
            return Err(SyncError::DomainViolation {
                location: "keysvc:decrypt".to_string(),
                expected: key_ref.domain,
                found,
            });
        }

        let body = ciphertext
            .body()
            .ok_or_else(|| SyncError::EncryptionService("missing domain marker".to_string()))?;
        let raw = BASE64
            .decode(body)
            .map_err(|_| SyncError::EncryptionService("malformed ciphertext body".to_string()))?;
        if raw.len() <= NONCE_LEN {
            return Err(SyncError::EncryptionService(
                "ciphertext body too short".to_string(),
            ));
        }

        let keys = self.keys.read().await;
        let key = keys.get(&key_ref.key_id).ok_or_else(|| {
            SyncError::EncryptionService(format!("unknown key reference {}", key_ref.key_id))
        })?;

        let (nonce, sealed) = raw.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new(key);
        cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| SyncError::EncryptionService("decryption failed".to_string()))
    }
}
