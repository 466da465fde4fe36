//! Response DTOs for the sync engine API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use uuid::Uuid;

use crate::domain::{IntegrityReport, ViolationEvent};
use crate::entities::ChatRecord;
use crate::flush::FlushOutcome;
use crate::tasks::ReconcilerStats;

/// Response body for POST /chats/ensure
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    /// The chat id
    pub chat_id: Uuid,
    /// Hashed owner identifier
    pub owner_id: String,
    /// Last persisted title version
    pub title_version: u64,
    /// Last persisted messages version
    pub messages_version: u64,
}

impl ChatResponse {
    /// Creates a ChatResponse from a durable record.
    pub fn from_record(record: &ChatRecord) -> Self {
        Self {
            chat_id: record.chat_id,
            owner_id: record.owner_id.to_string(),
            title_version: record.title_version,
            messages_version: record.messages_version,
        }
    }
}

/// Response body for POST /logout/flush
#[derive(Debug, Clone, Serialize)]
pub struct FlushDraftResponse {
    /// The chat whose draft was flushed
    pub chat_id: Uuid,
    /// `flushed`, `clean`, or `deferred`
    pub outcome: String,
}

impl FlushDraftResponse {
    /// Creates a FlushDraftResponse from a flush outcome.
    pub fn new(chat_id: Uuid, outcome: FlushOutcome) -> Self {
        let outcome = match outcome {
            FlushOutcome::Flushed => "flushed",
            FlushOutcome::Clean => "clean",
            FlushOutcome::Deferred => "deferred",
        };
        Self {
            chat_id,
            outcome: outcome.to_string(),
        }
    }
}

/// Response body for GET /diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticsResponse {
    /// Domain violations detected since startup
    pub domain_violations: u64,
    /// Most recent violation events
    pub recent_violations: Vec<ViolationEvent>,
    /// Outcome of the integrity sweep this request triggered
    pub integrity: IntegrityReport,
    /// Stale keys seen by the last reconciler pass
    pub stale_keys: u64,
    /// Jobs awaiting a runner
    pub pending_jobs: usize,
    /// Jobs parked for operator inspection
    pub dead_letter_jobs: usize,
}

/// Response body for GET /stats
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Reconciler pass counters
    pub reconciler: ReconcilerStats,
    /// Jobs awaiting a runner
    pub pending_jobs: usize,
    /// Jobs parked for operator inspection
    pub dead_letter_jobs: usize,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp.
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
