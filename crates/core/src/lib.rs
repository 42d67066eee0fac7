//! Medialoom domain core.
//!
//! Pure domain logic with zero internal dependencies so it can be used by
//! the API/repository layer and any future worker or CLI tooling: the task
//! lifecycle state machine, run-type categories, cost calculation, auto
//! top-up eligibility, and webhook signature verification.

pub mod costing;
pub mod error;
pub mod lifecycle;
pub mod run_types;
pub mod topup;
pub mod types;
pub mod webhooks;
