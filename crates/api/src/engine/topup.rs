//! Auto-top-up execution: evaluate a user, charge the stored payment
//! method, and record the replenishment.
//!
//! The rate-limit timestamp is stamped before the external charge call and
//! acts as the concurrency guard; no database lock is held across the
//! processor round trip.

use std::sync::Arc;

use chrono::Utc;
use medialoom_core::topup::{self, TopupDecision};
use medialoom_core::types::DbId;
use medialoom_db::models::ledger::{LedgerEntryType, RecordCredit};
use medialoom_db::models::user::User;
use medialoom_db::repositories::{LedgerRepo, UserRepo};
use medialoom_db::DbPool;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::payments::{ChargeOutcome, PaymentGateway};

/// Result of one per-user top-up attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TopupOutcome {
    /// Evaluation decided against an attempt (includes `rate_limited`).
    Skipped { reason: &'static str },
    /// The charge settled and an `auto_topup` ledger entry was recorded.
    Charged { amount_minor: i64, charge_id: String },
    /// Terminal card refusal; auto-top-up is now disabled for the user.
    Declined { reason: String },
    /// Transient processor failure; the feature stays enabled and the
    /// rate-limit window defers the next attempt.
    Failed { error: String },
}

/// Evaluate one user and, if due, execute a top-up through the gateway.
pub async fn evaluate_and_topup(
    pool: &DbPool,
    gateway: &Arc<dyn PaymentGateway>,
    user_id: DbId,
) -> AppResult<TopupOutcome> {
    let user = UserRepo::find_by_id(pool, user_id)
        .await?
        .ok_or(medialoom_core::error::CoreError::NotFound {
            entity: "User",
            id: user_id,
        })?;

    // Decide against the ledger-derived balance, not the cached column.
    let balance = LedgerRepo::balance(pool, user.id).await?;
    let decision = topup::evaluate(&user.topup_profile(balance), Utc::now());
    if decision != TopupDecision::Eligible {
        tracing::debug!(user_id = user.id, reason = decision.reason(), "Top-up skipped");
        return Ok(TopupOutcome::Skipped {
            reason: decision.reason(),
        });
    }

    // Stamp the rate-limit window before calling out, so a crashed or slow
    // attempt cannot be retried into a duplicate charge.
    UserRepo::mark_topup_triggered(pool, user.id).await?;

    execute_charge(pool, gateway, &user).await
}

/// Charge the stored method and record the outcome.
async fn execute_charge(
    pool: &DbPool,
    gateway: &Arc<dyn PaymentGateway>,
    user: &User,
) -> Result<TopupOutcome, AppError> {
    // Eligibility guaranteed both refs are present.
    let customer_ref = user.payment_customer_ref.as_deref().unwrap_or_default();
    let method_ref = user.payment_method_ref.as_deref().unwrap_or_default();
    let idempotency_key = format!("auto-topup-{}-{}", user.id, Uuid::new_v4());

    match gateway
        .charge_saved_method(
            customer_ref,
            method_ref,
            user.auto_topup_amount,
            &idempotency_key,
        )
        .await
    {
        Ok(ChargeOutcome::Succeeded { charge_id }) => {
            LedgerRepo::record_credit(
                pool,
                &RecordCredit {
                    user_id: user.id,
                    task_id: None,
                    amount: user.auto_topup_amount,
                    entry_type: LedgerEntryType::AutoTopup,
                    metadata: serde_json::json!({
                        "charge_id": charge_id,
                        "trigger": "auto_topup",
                    }),
                },
            )
            .await?;

            tracing::info!(
                user_id = user.id,
                amount_minor = user.auto_topup_amount,
                charge_id = %charge_id,
                "Auto-top-up charged and credited",
            );
            Ok(TopupOutcome::Charged {
                amount_minor: user.auto_topup_amount,
                charge_id,
            })
        }
        Ok(ChargeOutcome::Declined { reason }) => {
            // Terminal card failure: switch the feature off so the user is
            // not charged into a decline loop every hour.
            UserRepo::disable_auto_topup(pool, user.id).await?;
            tracing::warn!(
                user_id = user.id,
                reason = %reason,
                "Auto-top-up declined; feature disabled for user",
            );
            Ok(TopupOutcome::Declined { reason })
        }
        Err(e) => {
            tracing::error!(user_id = user.id, error = %e, "Auto-top-up charge failed");
            Ok(TopupOutcome::Failed {
                error: e.to_string(),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Sweep
// ---------------------------------------------------------------------------

/// Per-user result within a sweep.
#[derive(Debug, Serialize)]
pub struct SweepEntry {
    pub user_id: DbId,
    #[serde(flatten)]
    pub outcome: TopupOutcome,
}

/// Aggregate report for one sweep over all eligible users.
#[derive(Debug, Serialize)]
pub struct SweepReport {
    pub evaluated: usize,
    pub charged: usize,
    pub declined: usize,
    pub failed: usize,
    pub skipped: usize,
    pub entries: Vec<SweepEntry>,
}

/// Evaluate every plausible candidate and attempt top-ups.
pub async fn sweep(pool: &DbPool, gateway: &Arc<dyn PaymentGateway>) -> AppResult<SweepReport> {
    let candidates = UserRepo::topup_candidates(pool).await?;
    let mut report = SweepReport {
        evaluated: candidates.len(),
        charged: 0,
        declined: 0,
        failed: 0,
        skipped: 0,
        entries: Vec::with_capacity(candidates.len()),
    };

    for user in candidates {
        let outcome = evaluate_and_topup(pool, gateway, user.id).await?;
        match &outcome {
            TopupOutcome::Charged { .. } => report.charged += 1,
            TopupOutcome::Declined { .. } => report.declined += 1,
            TopupOutcome::Failed { .. } => report.failed += 1,
            TopupOutcome::Skipped { .. } => report.skipped += 1,
        }
        report.entries.push(SweepEntry {
            user_id: user.id,
            outcome,
        });
    }

    tracing::info!(
        evaluated = report.evaluated,
        charged = report.charged,
        declined = report.declined,
        failed = report.failed,
        skipped = report.skipped,
        "Auto-top-up sweep finished",
    );
    Ok(report)
}
