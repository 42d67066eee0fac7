//! Periodic worker liveness sweep.
//!
//! Marks workers whose heartbeat aged past the liveness window as gone so
//! the counts diagnostics reflect the real fleet. Tasks claimed by such
//! workers are NOT requeued; dead-worker task recovery is a deliberate
//! extension this system does not implement.

use std::time::Duration;

use medialoom_db::repositories::WorkerRepo;
use medialoom_db::DbPool;
use tokio_util::sync::CancellationToken;

/// Background worker-liveness sweeper.
pub struct LivenessSweeper {
    pool: DbPool,
    interval: Duration,
}

impl LivenessSweeper {
    pub fn new(pool: DbPool, interval_secs: u64) -> Self {
        Self {
            pool,
            interval: Duration::from_secs(interval_secs),
        }
    }

    /// Run the sweep loop until the cancellation token is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Worker liveness sweeper started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Worker liveness sweeper shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    match WorkerRepo::mark_stale_gone(&self.pool).await {
                        Ok(0) => {}
                        Ok(flipped) => {
                            tracing::warn!(flipped, "Marked stale workers as gone");
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Worker liveness sweep failed");
                        }
                    }
                }
            }
        }
    }
}
