//! Route definitions for the credits ledger.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::ledger;
use crate::state::AppState;

/// Routes mounted at `/ledger`.
///
/// ```text
/// GET  /balance -> get_balance
/// GET  /entries -> list_entries
/// POST /credits -> record_credit (service only)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/balance", get(ledger::get_balance))
        .route("/entries", get(ledger::list_entries))
        .route("/credits", post(ledger::record_credit))
}
