//! API Routes
//!
//! Configures the Axum router with all exposed endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    diagnostics_handler, ensure_chat_handler, flush_draft_handler, health_handler, stats_handler,
    AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `POST /chats/ensure` - Idempotent durable chat creation
/// - `POST /logout/flush` - Synchronous draft flush at session end
/// - `GET /diagnostics` - Integrity sweep + violation/staleness report
/// - `GET /stats` - Engine counters
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router with all endpoints
    Router::new()
        .route("/chats/ensure", post(ensure_chat_handler))
        .route("/logout/flush", post(flush_draft_handler))
        .route("/diagnostics", get(diagnostics_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
