//! Route definitions for tasks.
//!
//! Creation, listing, and cancellation accept user tokens (own scope).
//! Completion, failure, and costing are worker-side service operations.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::tasks;
use crate::state::AppState;

/// Routes mounted at `/tasks`.
///
/// ```text
/// POST /                   -> create_task
/// GET  /                   -> list_tasks
/// GET  /{id}               -> get_task
/// POST /{id}/cancel        -> cancel_task
/// GET  /{id}/dependencies  -> get_dependencies
/// POST /{id}/complete      -> complete_task
/// POST /{id}/fail          -> fail_task
/// POST /{id}/cost          -> cost_task
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(tasks::create_task).get(tasks::list_tasks))
        .route("/{id}", get(tasks::get_task))
        .route("/{id}/cancel", post(tasks::cancel_task))
        .route("/{id}/dependencies", get(tasks::get_dependencies))
        .route("/{id}/complete", post(tasks::complete_task))
        .route("/{id}/fail", post(tasks::fail_task))
        .route("/{id}/cost", post(tasks::cost_task))
}
