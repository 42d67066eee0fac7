//! Handlers for credit balance, ledger entries, and manual adjustments.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use medialoom_core::costing::MINOR_UNITS_PER_CREDIT;
use medialoom_core::error::CoreError;
use medialoom_core::types::DbId;
use medialoom_db::models::ledger::{LedgerEntryType, RecordCredit};
use medialoom_db::repositories::{LedgerRepo, UserRepo};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::{Principal, RequireService};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// Query parameters for balance/entries: service callers pick the user,
/// user tokens are confined to themselves.
#[derive(Debug, Deserialize)]
pub struct LedgerScopeQuery {
    pub user_id: Option<DbId>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Response for GET /ledger/balance.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub user_id: DbId,
    /// Ledger-derived balance in minor units.
    pub balance_minor: i64,
    /// The same balance in credits.
    pub credits: f64,
}

/// Request body for POST /ledger/credits (service only).
#[derive(Debug, Deserialize)]
pub struct RecordCreditRequest {
    pub user_id: DbId,
    /// Positive amount in minor units.
    pub amount_minor: i64,
    /// `manual` or `refund`; purchase and top-up entries come from the
    /// payment webhook and the top-up engine.
    pub entry_type: LedgerEntryType,
    pub task_id: Option<DbId>,
    pub metadata: Option<serde_json::Value>,
}

/// Resolve which user the caller may read or adjust.
fn resolve_scope(principal: Principal, requested: Option<DbId>) -> Result<DbId, AppError> {
    match principal {
        Principal::User(own) => {
            if let Some(user_id) = requested {
                principal.authorize_user(user_id)?;
            }
            Ok(own)
        }
        Principal::Service => requested.ok_or_else(|| {
            AppError::Core(CoreError::Validation(
                "user_id is required for service callers".into(),
            ))
        }),
    }
}

// ---------------------------------------------------------------------------
// Balance and entries
// ---------------------------------------------------------------------------

/// GET /api/v1/ledger/balance
///
/// The ledger-derived balance, never the cached column.
pub async fn get_balance(
    principal: Principal,
    State(state): State<AppState>,
    Query(params): Query<LedgerScopeQuery>,
) -> AppResult<impl IntoResponse> {
    let user_id = resolve_scope(principal, params.user_id)?;
    let balance_minor = LedgerRepo::balance(&state.pool, user_id).await?;

    Ok(Json(DataResponse {
        data: BalanceResponse {
            user_id,
            balance_minor,
            credits: balance_minor as f64 / MINOR_UNITS_PER_CREDIT,
        },
    }))
}

/// GET /api/v1/ledger/entries
pub async fn list_entries(
    principal: Principal,
    State(state): State<AppState>,
    Query(params): Query<LedgerScopeQuery>,
) -> AppResult<impl IntoResponse> {
    let user_id = resolve_scope(principal, params.user_id)?;
    let entries =
        LedgerRepo::list_for_user(&state.pool, user_id, params.limit, params.offset).await?;
    Ok(Json(DataResponse { data: entries }))
}

// ---------------------------------------------------------------------------
// Manual adjustments (service only)
// ---------------------------------------------------------------------------

/// POST /api/v1/ledger/credits
///
/// Record a manual grant or refund. Spend entries come only from costing;
/// purchase and top-up entries come only from the webhook and the engine.
pub async fn record_credit(
    RequireService(_principal): RequireService,
    State(state): State<AppState>,
    Json(input): Json<RecordCreditRequest>,
) -> AppResult<impl IntoResponse> {
    if input.amount_minor <= 0 {
        return Err(AppError::Core(CoreError::Validation(
            "amount_minor must be positive".into(),
        )));
    }
    if !matches!(
        input.entry_type,
        LedgerEntryType::Manual | LedgerEntryType::Refund
    ) {
        return Err(AppError::Core(CoreError::Validation(
            "entry_type must be manual or refund".into(),
        )));
    }

    UserRepo::find_by_id(&state.pool, input.user_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "User",
            id: input.user_id,
        })?;

    let entry = LedgerRepo::record_credit(
        &state.pool,
        &RecordCredit {
            user_id: input.user_id,
            task_id: input.task_id,
            amount: input.amount_minor,
            entry_type: input.entry_type,
            metadata: input
                .metadata
                .unwrap_or_else(|| serde_json::json!({})),
        },
    )
    .await?;

    tracing::info!(
        user_id = input.user_id,
        amount_minor = input.amount_minor,
        entry_type = input.entry_type.as_str(),
        "Manual ledger credit recorded",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: entry })))
}
