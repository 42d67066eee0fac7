//! Payment processor webhook handler.
//!
//! Signature verification over the raw body happens before anything else;
//! an unverifiable event is rejected with 401 and causes no state change.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use medialoom_core::error::CoreError;
use medialoom_core::types::DbId;
use medialoom_core::webhooks::{verify_signature, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use medialoom_db::models::ledger::{LedgerEntryType, RecordCredit};
use medialoom_db::repositories::{LedgerRepo, UserRepo};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::payments::gateway::DECLINED_STATUSES;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Event payload
// ---------------------------------------------------------------------------

const EVENT_CREDIT_PURCHASE: &str = "credit_purchase.completed";
const EVENT_CHARGE_SUCCEEDED: &str = "charge.succeeded";
const EVENT_CHARGE_FAILED: &str = "charge.failed";

/// A signed event from the payment processor.
#[derive(Debug, Deserialize)]
struct PaymentEvent {
    #[serde(rename = "type")]
    kind: String,
    data: PaymentEventData,
}

#[derive(Debug, Deserialize)]
struct PaymentEventData {
    user_id: DbId,
    /// Amount actually paid/settled, in minor units.
    #[serde(default)]
    amount_minor: Option<i64>,
    /// Credit amount declared in the checkout metadata, in minor units.
    #[serde(default)]
    declared_amount_minor: Option<i64>,
    #[serde(default)]
    charge_id: Option<String>,
    /// Set on charge events that belong to an auto-top-up.
    #[serde(default)]
    auto_topup: Option<bool>,
    #[serde(default)]
    failure_reason: Option<String>,
}

/// Acknowledgement returned for every processed event.
#[derive(Debug, Serialize)]
struct WebhookAck {
    received: bool,
    action: &'static str,
}

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

/// POST /api/v1/webhooks/payments
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> AppResult<impl IntoResponse> {
    // --- Signature verification before any processing ---
    let timestamp: i64 = headers
        .get(TIMESTAMP_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Missing or invalid webhook timestamp".into(),
            ))
        })?;
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Missing webhook signature".into(),
            ))
        })?;

    if !verify_signature(&state.config.webhook_secret, timestamp, &body, signature) {
        return Err(AppError::Core(CoreError::Unauthorized(
            "Invalid webhook signature".into(),
        )));
    }

    let event: PaymentEvent = serde_json::from_str(&body)
        .map_err(|e| CoreError::Validation(format!("malformed webhook payload: {e}")))?;

    let action = match event.kind.as_str() {
        EVENT_CREDIT_PURCHASE => handle_credit_purchase(&state, &event.data).await?,
        EVENT_CHARGE_SUCCEEDED => handle_charge_succeeded(&state, &event.data).await?,
        EVENT_CHARGE_FAILED => handle_charge_failed(&state, &event.data).await?,
        other => {
            tracing::debug!(kind = other, "Ignoring unhandled webhook event");
            "ignored"
        }
    };

    Ok(Json(DataResponse {
        data: WebhookAck {
            received: true,
            action,
        },
    }))
}

// ---------------------------------------------------------------------------
// Event handlers
// ---------------------------------------------------------------------------

/// A completed checkout: credit the purchased amount after validating the
/// paid amount matches what the checkout metadata declared.
async fn handle_credit_purchase(
    state: &AppState,
    data: &PaymentEventData,
) -> Result<&'static str, AppError> {
    let amount = data.amount_minor.ok_or_else(|| {
        CoreError::Validation("credit purchase event is missing amount_minor".into())
    })?;
    let declared = data.declared_amount_minor.ok_or_else(|| {
        CoreError::Validation("credit purchase event is missing declared_amount_minor".into())
    })?;
    if amount != declared {
        return Err(AppError::Core(CoreError::Validation(format!(
            "paid amount {amount} does not match declared credit amount {declared}"
        ))));
    }

    UserRepo::find_by_id(&state.pool, data.user_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "User",
            id: data.user_id,
        })?;

    LedgerRepo::record_credit(
        &state.pool,
        &RecordCredit {
            user_id: data.user_id,
            task_id: None,
            amount,
            entry_type: LedgerEntryType::Stripe,
            metadata: serde_json::json!({
                "charge_id": data.charge_id,
                "declared_amount_minor": declared,
            }),
        },
    )
    .await?;

    tracing::info!(
        user_id = data.user_id,
        amount_minor = amount,
        charge_id = ?data.charge_id,
        "Credit purchase recorded from webhook",
    );
    Ok("credited")
}

/// A settled charge tagged as an auto-top-up (asynchronous-capture
/// processors confirm through this path rather than the charge response).
async fn handle_charge_succeeded(
    state: &AppState,
    data: &PaymentEventData,
) -> Result<&'static str, AppError> {
    if data.auto_topup != Some(true) {
        return Ok("ignored");
    }
    let amount = data.amount_minor.ok_or_else(|| {
        CoreError::Validation("charge event is missing amount_minor".into())
    })?;

    UserRepo::find_by_id(&state.pool, data.user_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "User",
            id: data.user_id,
        })?;

    LedgerRepo::record_credit(
        &state.pool,
        &RecordCredit {
            user_id: data.user_id,
            task_id: None,
            amount,
            entry_type: LedgerEntryType::AutoTopup,
            metadata: serde_json::json!({
                "charge_id": data.charge_id,
                "trigger": "webhook",
            }),
        },
    )
    .await?;

    tracing::info!(
        user_id = data.user_id,
        amount_minor = amount,
        charge_id = ?data.charge_id,
        "Auto-top-up confirmed from webhook",
    );
    Ok("credited")
}

/// A failed charge: terminal card refusals disable auto-top-up for the
/// user; transient failures change nothing.
async fn handle_charge_failed(
    state: &AppState,
    data: &PaymentEventData,
) -> Result<&'static str, AppError> {
    let terminal = data
        .failure_reason
        .as_deref()
        .is_some_and(|reason| DECLINED_STATUSES.contains(&reason));
    if !terminal {
        return Ok("ignored");
    }

    UserRepo::disable_auto_topup(&state.pool, data.user_id).await?;
    tracing::warn!(
        user_id = data.user_id,
        reason = ?data.failure_reason,
        "Terminal charge failure; auto-top-up disabled",
    );
    Ok("auto_topup_disabled")
}
