//! Entity models and DTOs.
//!
//! Entity structs derive `FromRow` and match their table column-for-column.
//! Create/update DTOs live beside the entity they produce.

pub mod cost_config;
pub mod ledger;
pub mod project;
pub mod status;
pub mod task;
pub mod user;
pub mod worker;
