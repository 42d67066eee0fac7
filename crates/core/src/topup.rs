//! Auto-top-up eligibility: pure evaluation of a user's balance, top-up
//! configuration, and rate-limit window.
//!
//! Execution (charging the stored payment method, writing the ledger entry)
//! lives in the API layer; this module only decides whether an attempt may
//! be made. The `last_triggered` timestamp is the concurrency guard against
//! repeated charges, so the rate-limit check must happen before any call to
//! the payment processor.

use serde::Serialize;

use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Minimum seconds between top-up attempts for one user.
pub const RATE_LIMIT_SECS: i64 = 3600;

// ---------------------------------------------------------------------------
// Evaluation input
// ---------------------------------------------------------------------------

/// The slice of a user row that auto-top-up evaluation reads.
#[derive(Debug, Clone)]
pub struct TopupProfile {
    /// Ledger-derived balance in minor units.
    pub balance_minor: i64,
    pub enabled: bool,
    pub setup_completed: bool,
    pub has_payment_method: bool,
    pub threshold_minor: i64,
    pub last_triggered: Option<Timestamp>,
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// Outcome of evaluating one user for auto-top-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TopupDecision {
    /// A charge attempt may be made now.
    Eligible,
    /// Balance has not dropped to the configured threshold.
    AboveThreshold,
    /// The feature is switched off for this user.
    Disabled,
    /// Enabled but checkout/setup never completed.
    SetupIncomplete,
    /// No stored payment method to charge.
    NoPaymentMethod,
    /// A trigger happened within the rate-limit window; skip, do not retry.
    RateLimited,
}

impl TopupDecision {
    /// Short reason string for responses and logs.
    pub fn reason(self) -> &'static str {
        match self {
            Self::Eligible => "eligible",
            Self::AboveThreshold => "above_threshold",
            Self::Disabled => "disabled",
            Self::SetupIncomplete => "setup_incomplete",
            Self::NoPaymentMethod => "no_payment_method",
            Self::RateLimited => "rate_limited",
        }
    }
}

/// Evaluate whether a user is due for an auto-top-up attempt at `now`.
///
/// Check order: feature gates first, then the balance threshold, then the
/// rate limit. A rate-limited user is reported as such rather than retried
/// inline.
pub fn evaluate(profile: &TopupProfile, now: Timestamp) -> TopupDecision {
    if !profile.enabled {
        return TopupDecision::Disabled;
    }
    if !profile.setup_completed {
        return TopupDecision::SetupIncomplete;
    }
    if !profile.has_payment_method {
        return TopupDecision::NoPaymentMethod;
    }
    if profile.balance_minor > profile.threshold_minor {
        return TopupDecision::AboveThreshold;
    }
    if let Some(last) = profile.last_triggered {
        if (now - last).num_seconds() < RATE_LIMIT_SECS {
            return TopupDecision::RateLimited;
        }
    }
    TopupDecision::Eligible
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn eligible_profile() -> TopupProfile {
        TopupProfile {
            balance_minor: 500,
            enabled: true,
            setup_completed: true,
            has_payment_method: true,
            threshold_minor: 1000,
            last_triggered: None,
        }
    }

    #[test]
    fn below_threshold_with_no_prior_trigger_is_eligible() {
        assert_eq!(
            evaluate(&eligible_profile(), Utc::now()),
            TopupDecision::Eligible
        );
    }

    #[test]
    fn balance_equal_to_threshold_is_eligible() {
        let mut profile = eligible_profile();
        profile.balance_minor = profile.threshold_minor;
        assert_eq!(evaluate(&profile, Utc::now()), TopupDecision::Eligible);
    }

    #[test]
    fn balance_above_threshold_skips() {
        let mut profile = eligible_profile();
        profile.balance_minor = 1001;
        assert_eq!(
            evaluate(&profile, Utc::now()),
            TopupDecision::AboveThreshold
        );
    }

    #[test]
    fn trigger_ten_minutes_ago_is_rate_limited() {
        let now = Utc::now();
        let mut profile = eligible_profile();
        profile.last_triggered = Some(now - Duration::minutes(10));
        assert_eq!(evaluate(&profile, now), TopupDecision::RateLimited);
    }

    #[test]
    fn trigger_two_hours_ago_is_eligible_again() {
        let now = Utc::now();
        let mut profile = eligible_profile();
        profile.last_triggered = Some(now - Duration::hours(2));
        assert_eq!(evaluate(&profile, now), TopupDecision::Eligible);
    }

    #[test]
    fn disabled_wins_over_every_other_condition() {
        let mut profile = eligible_profile();
        profile.enabled = false;
        assert_eq!(evaluate(&profile, Utc::now()), TopupDecision::Disabled);
    }

    #[test]
    fn incomplete_setup_blocks() {
        let mut profile = eligible_profile();
        profile.setup_completed = false;
        assert_eq!(
            evaluate(&profile, Utc::now()),
            TopupDecision::SetupIncomplete
        );
    }

    #[test]
    fn missing_payment_method_blocks() {
        let mut profile = eligible_profile();
        profile.has_payment_method = false;
        assert_eq!(
            evaluate(&profile, Utc::now()),
            TopupDecision::NoPaymentMethod
        );
    }

    #[test]
    fn decision_reasons_are_stable() {
        assert_eq!(TopupDecision::RateLimited.reason(), "rate_limited");
        assert_eq!(TopupDecision::Eligible.reason(), "eligible");
    }
}
