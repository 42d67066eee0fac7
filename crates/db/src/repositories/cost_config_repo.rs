//! Repository for the `task_cost_configs` table.

use sqlx::PgPool;

use crate::models::cost_config::{TaskCostConfig, UpsertCostConfig};

/// Column list for `task_cost_configs` queries.
const COLUMNS: &str = "\
    id, task_type, is_active, billing_type, base_cost_per_second, unit_cost, \
    cost_factors, created_at, updated_at";

/// Provides lookup and upsert operations for task cost configuration.
pub struct CostConfigRepo;

impl CostConfigRepo {
    /// The active cost configuration for a task type, if one exists.
    pub async fn find_active(
        pool: &PgPool,
        task_type: &str,
    ) -> Result<Option<TaskCostConfig>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM task_cost_configs \
             WHERE task_type = $1 AND is_active"
        );
        sqlx::query_as::<_, TaskCostConfig>(&query)
            .bind(task_type)
            .fetch_optional(pool)
            .await
    }

    /// Replace the active configuration for a task type.
    ///
    /// Deactivates any existing active row for the type, then inserts the
    /// new one, in a single transaction so the partial unique index on
    /// active rows never trips.
    pub async fn upsert(
        pool: &PgPool,
        input: &UpsertCostConfig,
    ) -> Result<TaskCostConfig, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            "UPDATE task_cost_configs SET is_active = FALSE, updated_at = NOW() \
             WHERE task_type = $1 AND is_active",
        )
        .bind(&input.task_type)
        .execute(&mut *tx)
        .await?;

        let query = format!(
            "INSERT INTO task_cost_configs \
                 (task_type, billing_type, base_cost_per_second, unit_cost, cost_factors) \
             VALUES ($1, $2, $3, $4, COALESCE($5, '{{}}'::jsonb)) \
             RETURNING {COLUMNS}"
        );
        let config = sqlx::query_as::<_, TaskCostConfig>(&query)
            .bind(&input.task_type)
            .bind(&input.billing_type)
            .bind(input.base_cost_per_second)
            .bind(input.unit_cost)
            .bind(&input.cost_factors)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(config)
    }
}
