//! Task cost calculation: billing models, cost factors, and rounding rules.
//!
//! Costs are computed in credits with three-decimal precision and stored in
//! the ledger as integer minor units (1 credit = 1000 minor units), so the
//! ledger stays integral while fractional-cent pricing remains exact.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Fallback per-second rate applied when a task type has no active cost
/// configuration. Ledger metadata must record that this default was used.
pub const DEFAULT_COST_PER_SECOND: f64 = 0.01;

/// Minor units per credit. Chosen to match the three-decimal cost precision.
pub const MINOR_UNITS_PER_CREDIT: f64 = 1000.0;

/// Params key marking a task as the sub-task of an orchestrator parent.
pub const PARENT_TASK_KEY: &str = "parent_task_id";

// ---------------------------------------------------------------------------
// Billing model
// ---------------------------------------------------------------------------

/// How a task type is billed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingType {
    /// Billed by execution duration: `base_cost_per_second * duration`.
    PerSecond,
    /// Billed a fixed amount per task: `unit_cost` (duration-independent).
    PerUnit,
}

/// Configurable multipliers and additive terms layered onto a base rate.
///
/// Stored as JSONB on the cost-config row; missing keys mean "no factor".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CostFactors {
    /// Multiplier per resolution label (e.g. `"1920x1080" -> 1.5`).
    pub resolution: HashMap<String, f64>,
    /// Additive rate per frame. Scales with duration for per-second billing.
    pub frame_count: Option<f64>,
    /// Multiplier per model label (e.g. `"turbo" -> 0.5`).
    pub model_type: HashMap<String, f64>,
}

/// A resolved billing model for one task type: billing mode, rates, factors.
#[derive(Debug, Clone)]
pub struct CostModel {
    pub billing_type: BillingType,
    pub base_cost_per_second: Option<f64>,
    pub unit_cost: Option<f64>,
    pub factors: CostFactors,
}

impl CostModel {
    /// The documented fallback model for task types with no active config.
    pub fn default_per_second() -> Self {
        Self {
            billing_type: BillingType::PerSecond,
            base_cost_per_second: Some(DEFAULT_COST_PER_SECOND),
            unit_cost: None,
            factors: CostFactors::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Billing-relevant task parameters
// ---------------------------------------------------------------------------

/// The subset of a task's `params` payload that affects billing.
///
/// `params` is free-form JSON at the storage boundary; this is the typed
/// projection the cost math operates on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BillingParams {
    pub resolution: Option<String>,
    pub frame_count: Option<f64>,
    pub model_type: Option<String>,
    /// Present iff this task is a sub-task of an orchestrator parent.
    pub parent_task_id: Option<DbId>,
}

impl BillingParams {
    /// Extract billing-relevant fields from a task's raw `params` JSON.
    pub fn from_params(params: &serde_json::Value) -> Self {
        Self {
            resolution: params
                .get("resolution")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            frame_count: params.get("frame_count").and_then(|v| v.as_f64()),
            model_type: params
                .get("model_type")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            parent_task_id: params.get(PARENT_TASK_KEY).and_then(|v| v.as_i64()),
        }
    }

    /// Sub-tasks of an orchestrator parent are never billed individually.
    pub fn is_sub_task(&self) -> bool {
        self.parent_task_id.is_some()
    }
}

// ---------------------------------------------------------------------------
// Duration
// ---------------------------------------------------------------------------

/// Billable duration in whole seconds: `max(1, ceil(processed - started))`.
///
/// Fails with [`CoreError::IncompleteTiming`] if either timestamp is unset;
/// costing must never run against a partial execution window.
pub fn duration_secs(
    started_at: Option<Timestamp>,
    processed_at: Option<Timestamp>,
) -> Result<i64, CoreError> {
    let started = started_at.ok_or_else(|| {
        CoreError::IncompleteTiming("generation_started_at is not set".into())
    })?;
    let processed = processed_at.ok_or_else(|| {
        CoreError::IncompleteTiming("generation_processed_at is not set".into())
    })?;

    let millis = (processed - started).num_milliseconds();
    let secs = (millis as f64 / 1000.0).ceil() as i64;
    Ok(secs.max(1))
}

// ---------------------------------------------------------------------------
// Cost calculation
// ---------------------------------------------------------------------------

/// Calculate the cost in credits for one completed task.
///
/// Factors apply in a fixed order: resolution multiplier, frame-count
/// additive term, model-type multiplier. The result is rounded to three
/// decimal places and must be finite and non-negative.
pub fn calculate_cost(
    model: &CostModel,
    duration_secs: i64,
    params: &BillingParams,
) -> Result<f64, CoreError> {
    let mut cost = match model.billing_type {
        BillingType::PerSecond => {
            let rate = model.base_cost_per_second.ok_or_else(|| {
                CoreError::InvalidCost("per_second config has no base_cost_per_second".into())
            })?;
            rate * duration_secs as f64
        }
        BillingType::PerUnit => model.unit_cost.ok_or_else(|| {
            CoreError::InvalidCost("per_unit config has no unit_cost".into())
        })?,
    };

    // 1. Resolution multiplier (unknown labels fall back to 1).
    if let Some(resolution) = &params.resolution {
        cost *= model.factors.resolution.get(resolution).copied().unwrap_or(1.0);
    }

    // 2. Frame-count additive term.
    if let (Some(rate), Some(frames)) = (model.factors.frame_count, params.frame_count) {
        cost += match model.billing_type {
            BillingType::PerUnit => rate * frames,
            BillingType::PerSecond => rate * frames * duration_secs as f64,
        };
    }

    // 3. Model-type multiplier (unknown labels fall back to 1).
    if let Some(model_type) = &params.model_type {
        cost *= model.factors.model_type.get(model_type).copied().unwrap_or(1.0);
    }

    let rounded = round_to_thousandths(cost);
    if !rounded.is_finite() || rounded < 0.0 {
        return Err(CoreError::InvalidCost(format!(
            "computed cost {rounded} is not a finite non-negative number"
        )));
    }
    Ok(rounded)
}

/// Round a cost to three decimal places (half away from zero).
pub fn round_to_thousandths(cost: f64) -> f64 {
    (cost * 1000.0).round() / 1000.0
}

/// Convert a rounded credit cost to integer ledger minor units.
pub fn to_minor_units(cost: f64) -> i64 {
    (cost * MINOR_UNITS_PER_CREDIT).round() as i64
}
