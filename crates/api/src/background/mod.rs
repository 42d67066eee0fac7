//! Long-lived background tasks spawned by the server binary.

pub mod liveness_sweep;
pub mod topup_sweep;
