//! Cost configuration entity model and DTOs.

use medialoom_core::costing::{BillingType, CostModel};
use medialoom_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `task_cost_configs` table. One active row per task type.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TaskCostConfig {
    pub id: DbId,
    pub task_type: String,
    pub is_active: bool,
    /// `per_second` or `per_unit` (CHECK-constrained in the schema).
    pub billing_type: String,
    pub base_cost_per_second: Option<f64>,
    pub unit_cost: Option<f64>,
    /// JSONB factor tables; deserialized into `costing::CostFactors`.
    pub cost_factors: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TaskCostConfig {
    /// Resolve this row into the core billing model.
    ///
    /// Returns `None` for an unrecognized `billing_type`, which callers
    /// treat the same as a missing configuration (default rate applies).
    pub fn to_cost_model(&self) -> Option<CostModel> {
        let billing_type = match self.billing_type.as_str() {
            "per_second" => BillingType::PerSecond,
            "per_unit" => BillingType::PerUnit,
            _ => return None,
        };
        let factors = serde_json::from_value(self.cost_factors.clone()).unwrap_or_default();
        Some(CostModel {
            billing_type,
            base_cost_per_second: self.base_cost_per_second,
            unit_cost: self.unit_cost,
            factors,
        })
    }
}

/// DTO for creating or replacing the active config for a task type.
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertCostConfig {
    pub task_type: String,
    pub billing_type: String,
    pub base_cost_per_second: Option<f64>,
    pub unit_cost: Option<f64>,
    pub cost_factors: Option<serde_json::Value>,
}
