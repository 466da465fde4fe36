//! Key Service Trait
//!
//! Transit-style encrypt/decrypt API: payloads travel to the service,
//! ciphertext comes back stamped with its domain marker, and raw key bytes
//! are never exposed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Ciphertext, EncryptionDomain};
use crate::error::Result;

// == Key Reference ==
/// Opaque handle to a key held by the encryption service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyReference {
    /// Service-side key identifier
    pub key_id: Uuid,
    /// Domain the key belongs to
    pub domain: EncryptionDomain,
}

impl KeyReference {
    /// Creates a reference with a fresh key id.
    pub fn new(domain: EncryptionDomain) -> Self {
        Self {
            key_id: Uuid::new_v4(),
            domain,
        }
    }
}

// == Key Service ==
/// Envelope-encryption service interface.
#[async_trait]
pub trait KeyService: Send + Sync {
    /// Creates a key scoped to an owner or chat and returns its reference.
    async fn create_key(&self, scope: &str, domain: EncryptionDomain) -> Result<KeyReference>;

    /// Encrypts `plaintext` under the referenced key. The returned
    /// ciphertext carries the key's domain marker.
    async fn encrypt(&self, plaintext: &[u8], key: &KeyReference) -> Result<Ciphertext>;

    /// Decrypts ciphertext with the referenced key.
    ///
    /// Fails with a domain violation when the ciphertext's marker does not
    /// match the key's domain — never silent garbage output — and with an
    /// encryption-service error when the key cannot open the body.
    async fn decrypt(&self, ciphertext: &Ciphertext, key: &KeyReference) -> Result<Vec<u8>>;
}
