use std::sync::Arc;

use crate::config::ServerConfig;
use crate::payments::PaymentGateway;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: medialoom_db::DbPool,
    /// Server configuration (accessed by middleware and handlers).
    pub config: Arc<ServerConfig>,
    /// Payment processor gateway, injected so the billing engine is
    /// testable without the live service.
    pub payments: Arc<dyn PaymentGateway>,
}
