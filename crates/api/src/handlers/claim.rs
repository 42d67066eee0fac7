//! Handlers for the worker-claim protocol and queue counts.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use medialoom_core::error::CoreError;
use medialoom_core::run_types::RunCategory;
use medialoom_core::types::DbId;
use medialoom_db::models::task::{
    QueueBreakdown, QueueTotals, RecentTask, Task, UserQueueCount,
};
use medialoom_db::repositories::{TaskRepo, WorkerRepo};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::middleware::auth::Principal;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// Request body for POST /claim.
#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    /// The registered worker asking for work.
    pub worker_id: DbId,
    /// Optional run category restricting claimable task types.
    pub run_type: Option<RunCategory>,
}

/// Query parameters for GET /counts.
#[derive(Debug, Deserialize)]
pub struct CountsQuery {
    pub run_type: Option<RunCategory>,
}

/// Response for GET /counts.
#[derive(Debug, Serialize)]
pub struct CountsResponse {
    pub totals: QueueTotals,
    pub breakdown: QueueBreakdown,
    /// Per-user occupancy; present for service-identity callers only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<UserQueueCount>>,
    pub recent_tasks: Vec<RecentTask>,
}

fn category_types(run_type: Option<RunCategory>) -> Option<Vec<String>> {
    run_type.map(|category| {
        category
            .task_types()
            .iter()
            .map(|s| s.to_string())
            .collect()
    })
}

// ---------------------------------------------------------------------------
// Claim
// ---------------------------------------------------------------------------

/// POST /api/v1/claim
///
/// Atomically hand at most one eligible queued task to the requesting
/// worker. `data` is `null` when nothing is claimable -- an explicit
/// "no work" result, not an error.
pub async fn claim(
    principal: Principal,
    State(state): State<AppState>,
    Json(input): Json<ClaimRequest>,
) -> AppResult<impl IntoResponse> {
    let worker = WorkerRepo::find_by_id(&state.pool, input.worker_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Worker",
            id: input.worker_id,
        })?;

    let claimed: Option<Task> = TaskRepo::claim_next(
        &state.pool,
        worker.id,
        principal.scope_user(),
        category_types(input.run_type),
    )
    .await?;

    if let Some(task) = &claimed {
        tracing::info!(
            task_id = task.id,
            worker_id = worker.id,
            task_type = %task.task_type,
            run_type = ?input.run_type,
            "Task claimed by worker",
        );
    }

    Ok(Json(DataResponse { data: claimed }))
}

// ---------------------------------------------------------------------------
// Counts
// ---------------------------------------------------------------------------

/// GET /api/v1/counts
///
/// Read-only queue diagnostics over the caller's scope. Never affects
/// claim ordering or eligibility.
pub async fn counts(
    principal: Principal,
    State(state): State<AppState>,
    Query(params): Query<CountsQuery>,
) -> AppResult<impl IntoResponse> {
    let scope = principal.scope_user();
    let run_types = category_types(params.run_type);

    let eligible =
        TaskRepo::count_eligible(&state.pool, scope, run_types.clone()).await?;
    let breakdown = TaskRepo::breakdown(&state.pool, scope, run_types).await?;
    let users = if principal.is_service() {
        Some(TaskRepo::per_user_counts(&state.pool).await?)
    } else {
        None
    };
    let recent_tasks = TaskRepo::recent(&state.pool, scope).await?;

    let totals = QueueTotals {
        queued_only: eligible,
        active_only: breakdown.in_progress_total,
        queued_plus_active: eligible + breakdown.in_progress_total,
    };

    Ok(Json(DataResponse {
        data: CountsResponse {
            totals,
            breakdown,
            users,
            recent_tasks,
        },
    }))
}
