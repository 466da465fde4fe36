//! API Models Module
//!
//! Request and response DTOs for the HTTP surface.

mod requests;
mod responses;

pub use requests::{EnsureChatRequest, FlushDraftRequest};
pub use responses::{
    ChatResponse, DiagnosticsResponse, ErrorResponse, FlushDraftResponse, HealthResponse,
    StatsResponse,
};
