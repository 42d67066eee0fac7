//! Handlers for the worker registry: registration, heartbeat, listing.
//!
//! Worker processes authenticate as the service identity.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use medialoom_core::error::CoreError;
use medialoom_core::types::DbId;
use medialoom_db::models::worker::RegisterWorker;
use medialoom_db::repositories::WorkerRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::RequireService;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/workers/register
///
/// Register a worker, or refresh its registration on name conflict.
pub async fn register(
    RequireService(_principal): RequireService,
    State(state): State<AppState>,
    Json(input): Json<RegisterWorker>,
) -> AppResult<impl IntoResponse> {
    if input.name.trim().is_empty() || input.hostname.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "name and hostname are required".into(),
        )));
    }

    let worker = WorkerRepo::register(&state.pool, &input).await?;
    tracing::info!(
        worker_id = worker.id,
        name = %worker.name,
        hostname = %worker.hostname,
        "Worker registered",
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: worker })))
}

/// POST /api/v1/workers/{id}/heartbeat
pub async fn heartbeat(
    RequireService(_principal): RequireService,
    State(state): State<AppState>,
    Path(worker_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    if !WorkerRepo::heartbeat(&state.pool, worker_id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Worker",
            id: worker_id,
        }));
    }
    Ok(Json(DataResponse {
        data: serde_json::json!({ "acknowledged": true }),
    }))
}

/// GET /api/v1/workers
pub async fn list(
    RequireService(_principal): RequireService,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let workers = WorkerRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: workers }))
}
