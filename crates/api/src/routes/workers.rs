//! Route definitions for the worker registry.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::workers;
use crate::state::AppState;

/// Routes mounted at `/workers` (service only).
///
/// ```text
/// POST /register         -> register
/// POST /{id}/heartbeat   -> heartbeat
/// GET  /                 -> list
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(workers::register))
        .route("/{id}/heartbeat", post(workers::heartbeat))
        .route("/", get(workers::list))
}
