//! Route definitions for claiming and queue counts.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::claim;
use crate::state::AppState;

/// Routes mounted at `/claim`.
///
/// ```text
/// POST / -> claim
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(claim::claim))
}

/// Routes mounted at `/counts`.
///
/// ```text
/// GET / -> counts
/// ```
pub fn counts_router() -> Router<AppState> {
    Router::new().route("/", get(claim::counts))
}
