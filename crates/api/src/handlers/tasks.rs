//! Handlers for task creation, lifecycle transitions, dependency
//! resolution, and costing.
//!
//! Task creation and cancellation are available to user tokens within
//! their own scope. Completion, failure, and costing are worker-side
//! operations restricted to the service identity.

use std::collections::BTreeSet;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use medialoom_core::error::CoreError;
use medialoom_core::lifecycle::state_machine;
use medialoom_core::types::DbId;
use medialoom_db::models::status::TaskStatus;
use medialoom_db::models::task::{
    CreateTask, DependencyResolution, LegacyDependencyView, Task, TaskListQuery,
};
use medialoom_db::repositories::{ProjectRepo, TaskRepo};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::engine::billing::{self, BillingOutcome};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{Principal, RequireService};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// Request body for POST /tasks.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    pub project_id: DbId,
    #[validate(length(min = 1, message = "task_type must not be empty"))]
    pub task_type: String,
    pub params: serde_json::Value,
    #[serde(default)]
    pub dependant_on: Vec<DbId>,
}

/// Request body for POST /tasks/{id}/complete.
#[derive(Debug, Deserialize, Validate)]
pub struct CompleteTaskRequest {
    #[validate(length(min = 1, message = "output_location must not be empty"))]
    pub output_location: String,
}

/// Request body for POST /tasks/{id}/fail.
#[derive(Debug, Deserialize, Validate)]
pub struct FailTaskRequest {
    #[validate(length(min = 1, message = "error_message must not be empty"))]
    pub error_message: String,
}

/// Response for POST /tasks/{id}/complete: the terminal row plus the
/// billing outcome (absent if costing errored; retryable via /cost).
#[derive(Debug, Serialize)]
pub struct CompleteTaskResponse {
    pub task: Task,
    pub billing: Option<BillingOutcome>,
}

/// Response for GET /tasks/{id}/dependencies: the full predecessor list
/// plus the legacy scalar mirror flattened alongside it.
#[derive(Debug, Serialize)]
pub struct DependenciesResponse {
    pub predecessors: Vec<medialoom_db::models::task::Predecessor>,
    pub all_complete: bool,
    #[serde(flatten)]
    pub legacy: LegacyDependencyView,
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Load a task and reject callers outside its owner's scope.
async fn load_scoped_task(
    state: &AppState,
    principal: Principal,
    task_id: DbId,
) -> AppResult<Task> {
    let task = TaskRepo::find_by_id(&state.pool, task_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Task",
            id: task_id,
        })?;

    let owner = ProjectRepo::owner_of(&state.pool, task.project_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Project",
            id: task.project_id,
        })?;
    principal.authorize_user(owner)?;

    Ok(task)
}

// ---------------------------------------------------------------------------
// Creation and queries
// ---------------------------------------------------------------------------

/// POST /api/v1/tasks
///
/// Enqueue a task. Every declared dependency must resolve to an existing
/// task owned by the same user, otherwise the request is rejected.
pub async fn create_task(
    principal: Principal,
    State(state): State<AppState>,
    Json(input): Json<CreateTaskRequest>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| CoreError::Validation(e.to_string()))?;
    if input.params.is_null() {
        return Err(AppError::Core(CoreError::Validation(
            "params is required".into(),
        )));
    }

    let project = ProjectRepo::find_by_id(&state.pool, input.project_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Project",
            id: input.project_id,
        })?;
    principal.authorize_user(project.user_id)?;

    let unique_deps: BTreeSet<DbId> = input.dependant_on.iter().copied().collect();
    if !unique_deps.is_empty() {
        let in_scope =
            TaskRepo::count_in_user_scope(&state.pool, project.user_id, &input.dependant_on)
                .await?;
        if in_scope < unique_deps.len() as i64 {
            return Err(AppError::Core(CoreError::Validation(
                "one or more dependencies do not resolve to tasks in this account".into(),
            )));
        }
    }

    let task = TaskRepo::create(
        &state.pool,
        project.id,
        &CreateTask {
            task_type: input.task_type,
            params: input.params,
            dependant_on: input.dependant_on,
        },
    )
    .await?;

    tracing::info!(
        task_id = task.id,
        project_id = project.id,
        task_type = %task.task_type,
        dependencies = task.dependant_on.len(),
        "Task enqueued",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: task })))
}

/// GET /api/v1/tasks/{id}
pub async fn get_task(
    principal: Principal,
    State(state): State<AppState>,
    Path(task_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let task = load_scoped_task(&state, principal, task_id).await?;
    Ok(Json(DataResponse { data: task }))
}

/// GET /api/v1/tasks
///
/// List tasks in the caller's scope with optional status filter.
pub async fn list_tasks(
    principal: Principal,
    State(state): State<AppState>,
    Query(params): Query<TaskListQuery>,
) -> AppResult<impl IntoResponse> {
    let tasks = TaskRepo::list(&state.pool, principal.scope_user(), &params).await?;
    Ok(Json(DataResponse { data: tasks }))
}

// ---------------------------------------------------------------------------
// Cancellation (owner-side)
// ---------------------------------------------------------------------------

/// POST /api/v1/tasks/{id}/cancel
///
/// Cancel a still-Queued task. Claimed tasks cannot be cancelled; there is
/// no preemption protocol.
pub async fn cancel_task(
    principal: Principal,
    State(state): State<AppState>,
    Path(task_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let task = load_scoped_task(&state, principal, task_id).await?;

    if !TaskRepo::cancel(&state.pool, task.id).await? {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "task {} has already been claimed or finished",
            task.id
        ))));
    }

    tracing::info!(task_id = task.id, "Task cancelled");
    Ok(Json(DataResponse {
        data: serde_json::json!({ "cancelled": true }),
    }))
}

// ---------------------------------------------------------------------------
// Dependencies
// ---------------------------------------------------------------------------

/// GET /api/v1/tasks/{id}/dependencies
///
/// Resolve the task's predecessors. The legacy scalar mirror is flattened
/// into the response alongside the full list.
pub async fn get_dependencies(
    principal: Principal,
    State(state): State<AppState>,
    Path(task_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let task = load_scoped_task(&state, principal, task_id).await?;
    let resolution: DependencyResolution =
        TaskRepo::resolve_dependencies(&state.pool, &task).await?;

    let legacy = resolution.legacy_view();
    Ok(Json(DataResponse {
        data: DependenciesResponse {
            all_complete: resolution.all_complete,
            predecessors: resolution.predecessors,
            legacy,
        },
    }))
}

// ---------------------------------------------------------------------------
// Worker-side transitions (service identity)
// ---------------------------------------------------------------------------

/// POST /api/v1/tasks/{id}/complete
///
/// Mark a claimed task Complete and cost it. Costing errors do not undo
/// the transition; the spend can be re-triggered via POST /tasks/{id}/cost
/// and the ledger's idempotence guard keeps that safe.
pub async fn complete_task(
    RequireService(_principal): RequireService,
    State(state): State<AppState>,
    Path(task_id): Path<DbId>,
    Json(input): Json<CompleteTaskRequest>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| CoreError::Validation(e.to_string()))?;

    // Existence check first so a missing task reports 404, not 409.
    let current = TaskRepo::find_by_id(&state.pool, task_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Task",
            id: task_id,
        })?;
    state_machine::validate_transition(current.status_id, TaskStatus::Complete.id())
        .map_err(CoreError::Conflict)?;

    // The SQL guard re-checks the edge atomically at commit time.
    let task = TaskRepo::complete(&state.pool, task_id, &input.output_location)
        .await?
        .ok_or_else(|| {
            CoreError::Conflict(format!("task {task_id} is not in progress"))
        })?;

    tracing::info!(
        task_id = task.id,
        worker_id = ?task.worker_id,
        "Task completed",
    );

    let billing = match billing::cost_completed_task(&state.pool, &task).await {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            tracing::error!(task_id = task.id, error = %e, "Costing failed after completion");
            None
        }
    };

    Ok(Json(DataResponse {
        data: CompleteTaskResponse { task, billing },
    }))
}

/// POST /api/v1/tasks/{id}/fail
///
/// Mark a claimed task Failed. Failed tasks are never costed.
pub async fn fail_task(
    RequireService(_principal): RequireService,
    State(state): State<AppState>,
    Path(task_id): Path<DbId>,
    Json(input): Json<FailTaskRequest>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| CoreError::Validation(e.to_string()))?;

    let current = TaskRepo::find_by_id(&state.pool, task_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Task",
            id: task_id,
        })?;
    state_machine::validate_transition(current.status_id, TaskStatus::Failed.id())
        .map_err(CoreError::Conflict)?;

    let task = TaskRepo::fail(&state.pool, task_id, &input.error_message)
        .await?
        .ok_or_else(|| {
            CoreError::Conflict(format!("task {task_id} is not in progress"))
        })?;

    tracing::info!(
        task_id = task.id,
        worker_id = ?task.worker_id,
        error = %input.error_message,
        "Task failed",
    );
    Ok(Json(DataResponse { data: task }))
}

// ---------------------------------------------------------------------------
// Costing
// ---------------------------------------------------------------------------

/// POST /api/v1/tasks/{id}/cost
///
/// Calculate and record the spend for a completed task. Idempotent:
/// re-invocation on an already-costed task reports `already_billed` and
/// writes nothing.
pub async fn cost_task(
    RequireService(_principal): RequireService,
    State(state): State<AppState>,
    Path(task_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let task = TaskRepo::find_by_id(&state.pool, task_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Task",
            id: task_id,
        })?;

    let outcome = billing::cost_completed_task(&state.pool, &task).await?;
    Ok(Json(DataResponse { data: outcome }))
}
