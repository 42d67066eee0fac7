//! Repository for the `users` table.

use medialoom_core::topup::RATE_LIMIT_SECS;
use medialoom_core::types::DbId;
use sqlx::PgPool;

use crate::models::user::{CreateUser, UpdateAutoTopupConfig, User};

/// Column list for `users` queries.
const COLUMNS: &str = "\
    id, email, display_name, is_active, credits, \
    auto_topup_enabled, auto_topup_setup_completed, auto_topup_amount, \
    auto_topup_threshold, auto_topup_last_triggered, \
    payment_customer_ref, payment_method_ref, created_at, updated_at";

/// Provides CRUD operations for users and their auto-top-up configuration.
pub struct UserRepo;

impl UserRepo {
    /// Create a new user.
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (email, display_name) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.email)
            .bind(&input.display_name)
            .fetch_one(pool)
            .await
    }

    /// Find a user by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Update auto-top-up configuration. Only non-`None` fields are applied.
    pub async fn update_auto_topup(
        pool: &PgPool,
        id: DbId,
        input: &UpdateAutoTopupConfig,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET
                auto_topup_enabled = COALESCE($2, auto_topup_enabled),
                auto_topup_setup_completed = COALESCE($3, auto_topup_setup_completed),
                auto_topup_amount = COALESCE($4, auto_topup_amount),
                auto_topup_threshold = COALESCE($5, auto_topup_threshold),
                payment_customer_ref = COALESCE($6, payment_customer_ref),
                payment_method_ref = COALESCE($7, payment_method_ref),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(input.enabled)
            .bind(input.setup_completed)
            .bind(input.amount)
            .bind(input.threshold)
            .bind(&input.payment_customer_ref)
            .bind(&input.payment_method_ref)
            .fetch_optional(pool)
            .await
    }

    /// Stamp a successful (or attempted) auto-top-up trigger.
    ///
    /// The timestamp is the rate-limit guard, so it is written before the
    /// external charge call, not after.
    pub async fn mark_topup_triggered(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET auto_topup_last_triggered = NOW(), updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Switch auto-top-up off after a terminal card failure.
    pub async fn disable_auto_topup(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET auto_topup_enabled = FALSE, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Users plausibly due for auto-top-up, for the sweep.
    ///
    /// This is a prefilter on the cached balance and the feature gates; the
    /// per-user evaluation re-checks against the ledger-derived balance and
    /// the rate-limit window before any charge.
    pub async fn topup_candidates(pool: &PgPool) -> Result<Vec<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users \
             WHERE is_active \
               AND auto_topup_enabled \
               AND auto_topup_setup_completed \
               AND payment_method_ref IS NOT NULL \
               AND credits <= auto_topup_threshold \
               AND (auto_topup_last_triggered IS NULL \
                    OR auto_topup_last_triggered < NOW() - make_interval(secs => $1)) \
             ORDER BY credits ASC"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(RATE_LIMIT_SECS as f64)
            .fetch_all(pool)
            .await
    }
}
