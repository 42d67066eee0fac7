//! Periodic auto-top-up sweep.
//!
//! A single long-lived Tokio task that evaluates all eligible users on an
//! interval. The per-user one-hour rate limit makes overlapping or frequent
//! sweeps harmless.

use std::sync::Arc;
use std::time::Duration;

use medialoom_db::DbPool;
use tokio_util::sync::CancellationToken;

use crate::engine::topup;
use crate::payments::PaymentGateway;

/// Background auto-top-up sweeper.
pub struct TopupSweeper {
    pool: DbPool,
    gateway: Arc<dyn PaymentGateway>,
    interval: Duration,
}

impl TopupSweeper {
    pub fn new(pool: DbPool, gateway: Arc<dyn PaymentGateway>, interval_secs: u64) -> Self {
        Self {
            pool,
            gateway,
            interval: Duration::from_secs(interval_secs),
        }
    }

    /// Run the sweep loop until the cancellation token is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Auto-top-up sweeper started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Auto-top-up sweeper shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = topup::sweep(&self.pool, &self.gateway).await {
                        tracing::error!(error = %e, "Auto-top-up sweep failed");
                    }
                }
            }
        }
    }
}
