//! Route definitions for auto-top-up administration.

use axum::routing::post;
use axum::Router;

use crate::handlers::topup;
use crate::state::AppState;

/// Routes mounted at `/topup`.
///
/// ```text
/// POST /setup              -> setup
/// POST /trigger/{user_id}  -> trigger (service only)
/// POST /sweep              -> sweep (service only)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/setup", post(topup::setup))
        .route("/trigger/{user_id}", post(topup::trigger))
        .route("/sweep", post(topup::sweep))
}
