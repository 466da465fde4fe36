//! Encryption Domain Module
//!
//! Classifies ciphertext by key provenance and guards tier boundaries.
//! Server-keyed ciphertext belongs to the AI-processing cache tier only;
//! user-keyed ciphertext is the only form allowed in the durable store and
//! the user-facing sync cache.

mod ciphertext;
mod guard;

pub use ciphertext::{Ciphertext, EncryptionDomain, Provenance, SERVER_PREFIX, USER_PREFIX};
pub use guard::{DomainGuard, IntegrityReport, ViolationEvent};
