//! Key Service Module
//!
//! Interface to the external envelope-encryption service. Key material
//! never leaves the service; callers hold opaque references only.

mod envelope;
mod service;

pub use envelope::EnvelopeKeyService;
pub use service::{KeyReference, KeyService};
