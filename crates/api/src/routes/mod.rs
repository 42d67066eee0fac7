//! Route definitions, one module per concern, assembled by [`api_routes`].

pub mod claim;
pub mod health;
pub mod ledger;
pub mod tasks;
pub mod topup;
pub mod webhooks;
pub mod workers;

use axum::Router;

use crate::state::AppState;

/// All routes mounted under `/api/v1`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/tasks", tasks::router())
        .nest("/claim", claim::router())
        .nest("/counts", claim::counts_router())
        .nest("/ledger", ledger::router())
        .nest("/topup", topup::router())
        .nest("/webhooks", webhooks::router())
        .nest("/workers", workers::router())
}
