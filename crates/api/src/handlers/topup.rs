//! Handlers for auto-top-up setup, triggering, and sweeping.
//!
//! Thin wrappers over the top-up engine; no business logic lives here.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use medialoom_core::error::CoreError;
use medialoom_core::types::DbId;
use medialoom_db::models::user::{UpdateAutoTopupConfig, UserResponse};
use medialoom_db::repositories::UserRepo;
use serde::Deserialize;

use crate::engine::topup;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{Principal, RequireService};
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for POST /topup/setup. User tokens omit `user_id` (or name
/// themselves); service callers must name the target.
#[derive(Debug, Deserialize)]
pub struct SetupRequest {
    pub user_id: Option<DbId>,
    #[serde(flatten)]
    pub config: UpdateAutoTopupConfig,
}

/// POST /api/v1/topup/setup
///
/// Enable, disable, or re-configure auto-top-up for a user.
pub async fn setup(
    principal: Principal,
    State(state): State<AppState>,
    Json(input): Json<SetupRequest>,
) -> AppResult<impl IntoResponse> {
    let target = match principal {
        Principal::User(own) => {
            if let Some(user_id) = input.user_id {
                principal.authorize_user(user_id)?;
            }
            own
        }
        Principal::Service => input.user_id.ok_or_else(|| {
            AppError::Core(CoreError::Validation(
                "user_id is required for service callers".into(),
            ))
        })?,
    };

    if input.config.amount.is_some_and(|v| v <= 0) {
        return Err(AppError::Core(CoreError::Validation(
            "amount must be positive".into(),
        )));
    }
    if input.config.threshold.is_some_and(|v| v < 0) {
        return Err(AppError::Core(CoreError::Validation(
            "threshold must not be negative".into(),
        )));
    }

    let user = UserRepo::update_auto_topup(&state.pool, target, &input.config)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "User",
            id: target,
        })?;

    tracing::info!(
        user_id = user.id,
        enabled = user.auto_topup_enabled,
        amount_minor = user.auto_topup_amount,
        threshold_minor = user.auto_topup_threshold,
        "Auto-top-up configuration updated",
    );

    Ok(Json(DataResponse {
        data: UserResponse::from(user),
    }))
}

/// POST /api/v1/topup/trigger/{user_id}
///
/// Evaluate one user and attempt a top-up if due. Service only.
pub async fn trigger(
    RequireService(_principal): RequireService,
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let outcome = topup::evaluate_and_topup(&state.pool, &state.payments, user_id).await?;
    Ok(Json(DataResponse { data: outcome }))
}

/// POST /api/v1/topup/sweep
///
/// Evaluate all eligible users for replenishment. Service only.
pub async fn sweep(
    RequireService(_principal): RequireService,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let report = topup::sweep(&state.pool, &state.payments).await?;
    Ok(Json(DataResponse { data: report }))
}
