//! Ciphertext Wire Form
//!
//! Ciphertext carries a structural prefix marker embedded by the encryption
//! service at encrypt time. Provenance is read from the marker, never guessed
//! from content.

use std::fmt;

use serde::{Deserialize, Serialize};

// == Wire Prefixes ==
/// Marker for ciphertext produced under a server-held envelope key.
pub const SERVER_PREFIX: &str = "enc:v1:srv:";

/// Marker for ciphertext produced under a user-held (or per-user wrapped) key.
pub const USER_PREFIX: &str = "enc:v1:usr:";

// == Encryption Domain ==
/// The two mutually exclusive key-provenance classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncryptionDomain {
    /// Server-held envelope key; AI-processing cache tier only.
    Server,
    /// User-controlled or per-user wrapped key; durable store and sync cache.
    User,
}

impl EncryptionDomain {
    /// Wire prefix the encryption service embeds for this domain.
    pub fn prefix(&self) -> &'static str {
        match self {
            EncryptionDomain::Server => SERVER_PREFIX,
            EncryptionDomain::User => USER_PREFIX,
        }
    }

    /// The provenance classification that matches this domain.
    pub fn provenance(&self) -> Provenance {
        match self {
            EncryptionDomain::Server => Provenance::Server,
            EncryptionDomain::User => Provenance::User,
        }
    }
}

impl fmt::Display for EncryptionDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncryptionDomain::Server => write!(f, "server"),
            EncryptionDomain::User => write!(f, "user"),
        }
    }
}

// == Provenance ==
/// Classification result for a piece of ciphertext.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Carries the server-domain marker
    Server,
    /// Carries the user-domain marker
    User,
    /// Carries no recognized marker
    Unknown,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Server => write!(f, "server"),
            Provenance::User => write!(f, "user"),
            Provenance::Unknown => write!(f, "unknown"),
        }
    }
}

// == Ciphertext ==
/// Opaque ciphertext in the encryption service's wire form.
///
/// The engine never inspects the encrypted body; only the prefix marker is
/// structural.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ciphertext(String);

impl Ciphertext {
    /// Wraps a wire-form string as received from the encryption service.
    pub fn from_wire(wire: impl Into<String>) -> Self {
        Self(wire.into())
    }

    /// Classifies this ciphertext by its structural prefix marker.
    pub fn provenance(&self) -> Provenance {
        if self.0.starts_with(SERVER_PREFIX) {
            Provenance::Server
        } else if self.0.starts_with(USER_PREFIX) {
            Provenance::User
        } else {
            Provenance::Unknown
        }
    }

    /// The wire form as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The encrypted body with the domain marker stripped, if one is present.
    pub fn body(&self) -> Option<&str> {
        self.0
            .strip_prefix(SERVER_PREFIX)
            .or_else(|| self.0.strip_prefix(USER_PREFIX))
    }
}

impl fmt::Display for Ciphertext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_server_marker() {
        let ct = Ciphertext::from_wire(format!("{}AAAA", SERVER_PREFIX));
        assert_eq!(ct.provenance(), Provenance::Server);
    }

    #[test]
    fn test_classify_user_marker() {
        let ct = Ciphertext::from_wire(format!("{}AAAA", USER_PREFIX));
        assert_eq!(ct.provenance(), Provenance::User);
    }

    #[test]
    fn test_classify_unmarked() {
        let ct = Ciphertext::from_wire("plaintext-or-garbage");
        assert_eq!(ct.provenance(), Provenance::Unknown);
    }

    #[test]
    fn test_marker_must_be_prefix() {
        // A marker embedded mid-string is not provenance.
        let ct = Ciphertext::from_wire(format!("xx{}AAAA", USER_PREFIX));
        assert_eq!(ct.provenance(), Provenance::Unknown);
    }

    #[test]
    fn test_body_strips_marker() {
        let ct = Ciphertext::from_wire(format!("{}AAAA", USER_PREFIX));
        assert_eq!(ct.body(), Some("AAAA"));

        let unmarked = Ciphertext::from_wire("AAAA");
        assert_eq!(unmarked.body(), None);
    }

    #[test]
    fn test_domain_prefix_round_trip() {
        for domain in [EncryptionDomain::Server, EncryptionDomain::User] {
            let ct = Ciphertext::from_wire(format!("{}body", domain.prefix()));
            assert_eq!(ct.provenance(), domain.provenance());
        }
    }

    #[test]
    fn test_serde_transparent() {
        let ct = Ciphertext::from_wire(format!("{}AAAA", USER_PREFIX));
        let json = serde_json::to_string(&ct).unwrap();
        assert_eq!(json, format!("\"{}AAAA\"", USER_PREFIX));

        let back: Ciphertext = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ct);
    }
}
