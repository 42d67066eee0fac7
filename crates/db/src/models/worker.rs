//! Worker registry entity models and DTOs.

use medialoom_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::status::StatusId;

/// A worker row from the `workers` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Worker {
    pub id: DbId,
    pub name: String,
    pub hostname: String,
    pub status_id: StatusId,
    pub last_heartbeat_at: Option<Timestamp>,
    pub registered_at: Timestamp,
    pub metadata: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for registering a worker (self-registration on startup).
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterWorker {
    pub name: String,
    pub hostname: String,
    pub metadata: Option<serde_json::Value>,
}
