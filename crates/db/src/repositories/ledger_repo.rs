//! Repository for the `credits_ledger` table.
//!
//! Entries are append-only. Every write adjusts the cached `users.credits`
//! mirror in the same transaction; the ledger sum stays the source of truth
//! and [`LedgerRepo::balance`] derives it directly.

use medialoom_core::types::DbId;
use sqlx::PgPool;

use crate::models::ledger::{CreditsLedgerEntry, LedgerEntryType, RecordCredit};

/// Column list for `credits_ledger` queries.
const COLUMNS: &str = "id, user_id, task_id, amount, entry_type, metadata, created_at";

/// Default page size for entry listing.
const DEFAULT_LIMIT: i64 = 50;

/// Maximum page size for entry listing.
const MAX_LIMIT: i64 = 200;

/// Provides append and balance operations for the credits ledger.
pub struct LedgerRepo;

impl LedgerRepo {
    /// Record the spend for a completed task, exactly once.
    ///
    /// Inserts a negative entry of `cost_minor` and adjusts the cached
    /// balance in one transaction. The partial unique index
    /// `uq_credits_ledger_spend_task` makes a second call for the same task
    /// a no-op: `ON CONFLICT DO NOTHING` returns no row and the cached
    /// balance is left untouched. Returns `None` when the task was already
    /// billed.
    pub async fn record_spend(
        pool: &PgPool,
        user_id: DbId,
        task_id: DbId,
        cost_minor: i64,
        metadata: serde_json::Value,
    ) -> Result<Option<CreditsLedgerEntry>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO credits_ledger (user_id, task_id, amount, entry_type, metadata) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (task_id) WHERE entry_type = 'spend' DO NOTHING \
             RETURNING {COLUMNS}"
        );
        let entry = sqlx::query_as::<_, CreditsLedgerEntry>(&query)
            .bind(user_id)
            .bind(task_id)
            .bind(-cost_minor)
            .bind(LedgerEntryType::Spend.as_str())
            .bind(&metadata)
            .fetch_optional(&mut *tx)
            .await?;

        if let Some(entry) = &entry {
            sqlx::query("UPDATE users SET credits = credits + $2, updated_at = NOW() WHERE id = $1")
                .bind(user_id)
                .bind(entry.amount)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(entry)
    }

    /// Record a positive credit entry (purchase, manual grant, refund, or
    /// auto-top-up) and adjust the cached balance in one transaction.
    pub async fn record_credit(
        pool: &PgPool,
        input: &RecordCredit,
    ) -> Result<CreditsLedgerEntry, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO credits_ledger (user_id, task_id, amount, entry_type, metadata) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        let entry = sqlx::query_as::<_, CreditsLedgerEntry>(&query)
            .bind(input.user_id)
            .bind(input.task_id)
            .bind(input.amount)
            .bind(input.entry_type.as_str())
            .bind(&input.metadata)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query("UPDATE users SET credits = credits + $2, updated_at = NOW() WHERE id = $1")
            .bind(input.user_id)
            .bind(entry.amount)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(entry)
    }

    /// The ledger-derived balance in minor units: the signed sum of the
    /// user's entries. Admission decisions use this, never the cached
    /// `users.credits` column alone.
    pub async fn balance(pool: &PgPool, user_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(amount), 0) FROM credits_ledger WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Whether a spend entry already exists for a task.
    pub async fn spend_exists(pool: &PgPool, task_id: DbId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS ( \
                 SELECT 1 FROM credits_ledger WHERE task_id = $1 AND entry_type = 'spend' \
             )",
        )
        .bind(task_id)
        .fetch_one(pool)
        .await
    }

    /// List a user's entries, newest first, with pagination.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<CreditsLedgerEntry>, sqlx::Error> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let query = format!(
            "SELECT {COLUMNS} FROM credits_ledger \
             WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, CreditsLedgerEntry>(&query)
            .bind(user_id)
            .bind(limit)
            .bind(offset.unwrap_or(0))
            .fetch_all(pool)
            .await
    }

    /// Recompute the cached `users.credits` mirror from the ledger sum.
    /// Returns the reconciled balance.
    pub async fn reconcile_user(pool: &PgPool, user_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "UPDATE users \
             SET credits = ( \
                 SELECT COALESCE(SUM(amount), 0) FROM credits_ledger WHERE user_id = users.id \
             ), updated_at = NOW() \
             WHERE id = $1 \
             RETURNING credits",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }
}
