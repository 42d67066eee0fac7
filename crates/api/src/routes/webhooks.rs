//! Route definitions for inbound webhooks.
//!
//! No bearer credential: the HMAC signature over the raw body is the
//! authentication.

use axum::routing::post;
use axum::Router;

use crate::handlers::webhooks;
use crate::state::AppState;

/// Routes mounted at `/webhooks`.
///
/// ```text
/// POST /payments -> payment_webhook
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/payments", post(webhooks::payment_webhook))
}
