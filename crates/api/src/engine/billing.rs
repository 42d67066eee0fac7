//! Costing a completed task and debiting the owner's ledger.
//!
//! This is the single trigger point between the task state machine and the
//! credit ledger. It is safe to call more than once for the same task: the
//! ledger's spend uniqueness makes the second call a no-op reported as
//! `already_billed`.

use medialoom_core::costing::{self, BillingParams, CostModel};
use medialoom_core::error::CoreError;
use medialoom_db::models::status::TaskStatus;
use medialoom_db::models::task::Task;
use medialoom_db::repositories::{CostConfigRepo, LedgerRepo, ProjectRepo};
use medialoom_db::DbPool;
use serde::Serialize;

use crate::error::{AppError, AppResult};

/// Result of one costing invocation.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum BillingOutcome {
    /// Costing does not apply: the task is an orchestrator sub-task and is
    /// billed through its parent. No ledger entry is written.
    Skipped { skipped: bool, reason: &'static str },
    /// Cost computed. `already_billed` is true when a previous invocation
    /// already wrote the spend entry and this call changed nothing.
    Billed {
        cost: f64,
        cost_minor: i64,
        billing_type: &'static str,
        duration_secs: i64,
        default_rate_applied: bool,
        already_billed: bool,
    },
}

/// Calculate the cost of a completed task and record the spend exactly once.
pub async fn cost_completed_task(pool: &DbPool, task: &Task) -> AppResult<BillingOutcome> {
    // Sub-task skip comes before any cost math or timing checks.
    let params = BillingParams::from_params(&task.params);
    if params.is_sub_task() {
        tracing::debug!(task_id = task.id, "Sub-task costing skipped");
        return Ok(BillingOutcome::Skipped {
            skipped: true,
            reason: "sub_task",
        });
    }

    if task.status_id != TaskStatus::Complete.id() {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "task {} is not complete and cannot be costed",
            task.id
        ))));
    }

    let duration_secs =
        costing::duration_secs(task.generation_started_at, task.generation_processed_at)
            .map_err(AppError::Core)?;

    // Missing configuration never fails the operation: the documented
    // default per-second rate applies and the ledger metadata records it.
    let config = CostConfigRepo::find_active(pool, &task.task_type).await?;
    let (model, default_rate_applied) = match config.as_ref().and_then(|c| c.to_cost_model()) {
        Some(model) => (model, false),
        None => (CostModel::default_per_second(), true),
    };

    let cost = costing::calculate_cost(&model, duration_secs, &params).map_err(AppError::Core)?;
    let cost_minor = costing::to_minor_units(cost);

    let owner = ProjectRepo::owner_of(pool, task.project_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Project",
            id: task.project_id,
        })?;

    let billing_type = match model.billing_type {
        medialoom_core::costing::BillingType::PerSecond => "per_second",
        medialoom_core::costing::BillingType::PerUnit => "per_unit",
    };

    let metadata = serde_json::json!({
        "task_type": task.task_type,
        "billing_type": billing_type,
        "duration_secs": duration_secs,
        "cost": cost,
        "default_rate_applied": default_rate_applied,
    });

    let entry = LedgerRepo::record_spend(pool, owner, task.id, cost_minor, metadata).await?;
    let already_billed = entry.is_none();

    if already_billed {
        tracing::debug!(task_id = task.id, "Spend already recorded, costing is a no-op");
    } else {
        tracing::info!(
            task_id = task.id,
            user_id = owner,
            cost,
            cost_minor,
            billing_type,
            duration_secs,
            default_rate_applied,
            "Task costed and spend recorded",
        );
    }

    Ok(BillingOutcome::Billed {
        cost,
        cost_minor,
        billing_type,
        duration_secs,
        default_rate_applied,
        already_billed,
    })
}
