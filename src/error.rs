//! Error types for the sync engine
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{EncryptionDomain, Provenance};

// == Sync Error Enum ==
/// Unified error type for the sync engine.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Cache or durable store temporarily unreachable.
    ///
    /// Retried on the next scheduled pass, never in a tight loop.
    #[error("Transient store error: {0}")]
    TransientStore(String),

    /// Key creation, encrypt, or decrypt failure.
    ///
    /// Fails the triggering operation outright; a chat is never created
    /// without its key reference.
    #[error("Encryption service error: {0}")]
    EncryptionService(String),

    /// Ciphertext found in the wrong storage tier.
    ///
    /// Logged as CRITICAL and aborts the operation. Never auto-repaired.
    #[error("Domain violation at {location}: expected {expected}, found {found}")]
    DomainViolation {
        location: String,
        expected: EncryptionDomain,
        found: Provenance,
    },

    /// Requested entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Durable chat record already exists.
    ///
    /// Internal signal for create races; callers treat it as
    /// success-by-another-writer.
    #[error("Chat already exists: {0}")]
    DuplicateChat(Uuid),

    /// Internal engine error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for SyncError {
    fn into_response(self) -> Response {
        let status = match &self {
            SyncError::TransientStore(_) => StatusCode::SERVICE_UNAVAILABLE,
            SyncError::EncryptionService(_) => StatusCode::BAD_GATEWAY,
            SyncError::DomainViolation { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            SyncError::NotFound(_) => StatusCode::NOT_FOUND,
            SyncError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            SyncError::DuplicateChat(_) => StatusCode::CONFLICT,
            SyncError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the sync engine.
pub type Result<T> = std::result::Result<T, SyncError>;
