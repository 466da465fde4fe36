//! API Handlers
//!
//! HTTP request handlers for each exposed endpoint.

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::context::SyncContext;
use crate::entities::OwnerId;
use crate::error::{Result, SyncError};
use crate::flush::flush_draft_on_logout;
use crate::queue::TaskQueue;
use crate::models::{
    ChatResponse, DiagnosticsResponse, EnsureChatRequest, FlushDraftRequest, FlushDraftResponse,
    HealthResponse, StatsResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The composed engine context
    pub ctx: Arc<SyncContext>,
}

impl AppState {
    /// Creates a new AppState over an engine context.
    pub fn new(ctx: Arc<SyncContext>) -> Self {
        Self { ctx }
    }
}

/// Handler for POST /chats/ensure
///
/// Idempotently creates the durable chat record and its server-side key
/// reference.
pub async fn ensure_chat_handler(
    State(state): State<AppState>,
    Json(req): Json<EnsureChatRequest>,
) -> Result<Json<ChatResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(SyncError::InvalidRequest(error_msg));
    }

    let owner = OwnerId::from_raw(&req.user_id);
    let record = state
        .ctx
        .lifecycle
        .ensure_chat_exists(req.chat_id, &owner)
        .await?;

    Ok(Json(ChatResponse::from_record(&record)))
}

/// Handler for POST /logout/flush
///
/// Synchronously flushes a pending draft at session end. Always completes:
/// a flush that cannot confirm persistence reports `deferred` and leaves the
/// draft for the scheduled reconciler.
pub async fn flush_draft_handler(
    State(state): State<AppState>,
    Json(req): Json<FlushDraftRequest>,
) -> Result<Json<FlushDraftResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(SyncError::InvalidRequest(error_msg));
    }

    let owner = OwnerId::from_raw(&req.user_id);
    let outcome = flush_draft_on_logout(&state.ctx, &owner, req.chat_id).await?;

    Ok(Json(FlushDraftResponse::new(req.chat_id, outcome)))
}

/// Handler for GET /diagnostics
///
/// Runs an integrity sweep over both tiers and reports violation and
/// staleness counters for operator tooling.
pub async fn diagnostics_handler(
    State(state): State<AppState>,
) -> Result<Json<DiagnosticsResponse>> {
    let ctx = &state.ctx;

    let integrity = ctx
        .guard
        .integrity_scan(
            ctx.cache.as_ref(),
            ctx.durable.as_ref(),
            ctx.config.scan_batch_size,
        )
        .await?;

    let stats = ctx.stats.read().await;
    Ok(Json(DiagnosticsResponse {
        domain_violations: ctx.guard.violation_count().await,
        recent_violations: ctx.guard.recent_violations().await,
        integrity,
        stale_keys: stats.stale_keys,
        pending_jobs: ctx.queue.pending_count().await,
        dead_letter_jobs: ctx.queue.dead_letter_count().await,
    }))
}

/// Handler for GET /stats
///
/// Returns engine counters.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let ctx = &state.ctx;
    let reconciler = ctx.stats.read().await.clone();

    Json(StatsResponse {
        reconciler,
        pending_jobs: ctx.queue.pending_count().await,
        dead_letter_jobs: ctx.queue.dead_letter_count().await,
    })
}

/// Handler for GET /health
///
/// Returns health status of the engine.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
