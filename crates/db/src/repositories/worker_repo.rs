//! Repository for the `workers` table.

use medialoom_core::lifecycle::WORKER_LIVENESS_WINDOW_SECS;
use medialoom_core::types::DbId;
use sqlx::PgPool;

use crate::models::status::WorkerStatus;
use crate::models::worker::{RegisterWorker, Worker};

/// Column list for `workers` queries.
const COLUMNS: &str = "\
    id, name, hostname, status_id, last_heartbeat_at, registered_at, \
    metadata, created_at, updated_at";

/// Provides registration, heartbeat, and liveness operations for workers.
pub struct WorkerRepo;

impl WorkerRepo {
    /// Register a new worker, or refresh fields on name conflict (upsert).
    ///
    /// Re-registration marks the worker active and touches its heartbeat.
    pub async fn register(pool: &PgPool, input: &RegisterWorker) -> Result<Worker, sqlx::Error> {
        let query = format!(
            "INSERT INTO workers (name, hostname, status_id, metadata, last_heartbeat_at)
             VALUES ($1, $2, $3, COALESCE($4, '{{}}'::jsonb), NOW())
             ON CONFLICT (name) DO UPDATE SET
                hostname = EXCLUDED.hostname,
                status_id = EXCLUDED.status_id,
                metadata = EXCLUDED.metadata,
                last_heartbeat_at = NOW(),
                updated_at = NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Worker>(&query)
            .bind(&input.name)
            .bind(&input.hostname)
            .bind(WorkerStatus::Active.id())
            .bind(&input.metadata)
            .fetch_one(pool)
            .await
    }

    /// Find a worker by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Worker>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM workers WHERE id = $1");
        sqlx::query_as::<_, Worker>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all workers ordered by name.
    pub async fn list(pool: &PgPool) -> Result<Vec<Worker>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM workers ORDER BY name ASC");
        sqlx::query_as::<_, Worker>(&query).fetch_all(pool).await
    }

    /// Touch the heartbeat timestamp for a worker and mark it active.
    ///
    /// Returns `false` if the worker does not exist.
    pub async fn heartbeat(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE workers SET last_heartbeat_at = NOW(), status_id = $2, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(WorkerStatus::Active.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark workers whose heartbeat aged past the liveness window as gone.
    ///
    /// Returns the number of workers flipped.
    pub async fn mark_stale_gone(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE workers SET status_id = $1, updated_at = NOW() \
             WHERE status_id <> $1 \
               AND (last_heartbeat_at IS NULL \
                    OR last_heartbeat_at < NOW() - make_interval(secs => $2))",
        )
        .bind(WorkerStatus::Gone.id())
        .bind(WORKER_LIVENESS_WINDOW_SECS as f64)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
