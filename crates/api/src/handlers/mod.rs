//! HTTP handlers, grouped by concern. Route definitions live in
//! `crate::routes`; handlers stay transport-thin and delegate to the
//! repositories and the engine.

pub mod claim;
pub mod health;
pub mod ledger;
pub mod tasks;
pub mod topup;
pub mod webhooks;
pub mod workers;
