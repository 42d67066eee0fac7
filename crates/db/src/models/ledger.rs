//! Credits ledger entity model and DTOs.
//!
//! Ledger entries are immutable: created by costing (spend), the payment
//! webhook (stripe/auto_topup), or manual adjustment (manual/refund), and
//! never mutated or deleted. A user's balance is the signed sum of their
//! entries.

use medialoom_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An immutable row from the `credits_ledger` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CreditsLedgerEntry {
    pub id: DbId,
    pub user_id: DbId,
    pub task_id: Option<DbId>,
    /// Signed amount in minor units; spend entries are negative.
    pub amount: i64,
    pub entry_type: String,
    pub metadata: serde_json::Value,
    pub created_at: Timestamp,
}

/// Balance-affecting event categories, matching the `entry_type` CHECK
/// constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEntryType {
    Stripe,
    Manual,
    Spend,
    Refund,
    AutoTopup,
}

impl LedgerEntryType {
    /// The `entry_type` column value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stripe => "stripe",
            Self::Manual => "manual",
            Self::Spend => "spend",
            Self::Refund => "refund",
            Self::AutoTopup => "auto_topup",
        }
    }
}

/// DTO for recording a positive (credit) ledger entry.
#[derive(Debug, Clone)]
pub struct RecordCredit {
    pub user_id: DbId,
    pub task_id: Option<DbId>,
    /// Positive amount in minor units.
    pub amount: i64,
    pub entry_type: LedgerEntryType,
    pub metadata: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_type_strings_match_check_constraint() {
        assert_eq!(LedgerEntryType::Stripe.as_str(), "stripe");
        assert_eq!(LedgerEntryType::Manual.as_str(), "manual");
        assert_eq!(LedgerEntryType::Spend.as_str(), "spend");
        assert_eq!(LedgerEntryType::Refund.as_str(), "refund");
        assert_eq!(LedgerEntryType::AutoTopup.as_str(), "auto_topup");
    }

    #[test]
    fn entry_type_serde_matches_column_value() {
        let json = serde_json::to_string(&LedgerEntryType::AutoTopup).unwrap();
        assert_eq!(json, "\"auto_topup\"");
    }
}
