//! User entity model and DTOs.

use medialoom_core::topup::TopupProfile;
use medialoom_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Full user row from the `users` table.
///
/// Carries payment references -- NEVER serialize this to API responses
/// directly. Use [`UserResponse`] for external-facing output.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    pub email: String,
    pub display_name: String,
    pub is_active: bool,
    /// Cached mirror of the ledger sum, in minor units.
    pub credits: i64,
    pub auto_topup_enabled: bool,
    pub auto_topup_setup_completed: bool,
    pub auto_topup_amount: i64,
    pub auto_topup_threshold: i64,
    pub auto_topup_last_triggered: Option<Timestamp>,
    pub payment_customer_ref: Option<String>,
    pub payment_method_ref: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    /// Build the auto-top-up evaluation input from this row and a
    /// ledger-derived balance. The cached `credits` column is never used
    /// for the decision.
    pub fn topup_profile(&self, balance_minor: i64) -> TopupProfile {
        TopupProfile {
            balance_minor,
            enabled: self.auto_topup_enabled,
            setup_completed: self.auto_topup_setup_completed,
            has_payment_method: self.payment_method_ref.is_some()
                && self.payment_customer_ref.is_some(),
            threshold_minor: self.auto_topup_threshold,
            last_triggered: self.auto_topup_last_triggered,
        }
    }
}

/// Safe user representation for API responses (no payment references).
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: DbId,
    pub email: String,
    pub display_name: String,
    pub is_active: bool,
    pub credits: i64,
    pub auto_topup_enabled: bool,
    pub auto_topup_threshold: i64,
    pub created_at: Timestamp,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            display_name: user.display_name,
            is_active: user.is_active,
            credits: user.credits,
            auto_topup_enabled: user.auto_topup_enabled,
            auto_topup_threshold: user.auto_topup_threshold,
            created_at: user.created_at,
        }
    }
}

/// DTO for creating a new user.
#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub display_name: String,
}

/// DTO for updating a user's auto-top-up configuration. All fields optional.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateAutoTopupConfig {
    pub enabled: Option<bool>,
    pub setup_completed: Option<bool>,
    pub amount: Option<i64>,
    pub threshold: Option<i64>,
    pub payment_customer_ref: Option<String>,
    pub payment_method_ref: Option<String>,
}
