//! API Module
//!
//! HTTP surface for the collaborator interfaces the engine exposes:
//! chat creation, logout flush, and operator diagnostics.

mod handlers;
mod routes;

pub use handlers::AppState;
pub use routes::create_router;
