//! Cross-repository workflows: costing completed tasks and executing
//! auto-top-ups.

pub mod billing;
pub mod topup;
