//! Run-type categories partitioning claimable task types.
//!
//! Workers claim with an optional run category so GPU fleets only pull
//! GPU-class work and lightweight pollers only pull API-class work. The
//! orchestrator category exists for parent tasks that fan out sub-tasks;
//! they hold no execution slot and their sub-tasks are not billed
//! individually.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Task-type sets
// ---------------------------------------------------------------------------

/// Task types executed on GPU workers.
pub const GPU_TASK_TYPES: &[&str] = &[
    "video_generation",
    "image_generation",
    "video_upscale",
    "lipsync",
];

/// Task types executed against hosted third-party APIs.
pub const API_TASK_TYPES: &[&str] = &[
    "prompt_generation",
    "voice_generation",
    "sound_effect",
];

/// Parent task types that coordinate sub-tasks. Excluded from per-user
/// concurrency counting; their sub-tasks are billed through the parent.
pub const ORCHESTRATOR_TASK_TYPES: &[&str] = &["scene_orchestrator", "batch_orchestrator"];

// ---------------------------------------------------------------------------
// Run category
// ---------------------------------------------------------------------------

/// Coarse category used to partition claimable task types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunCategory {
    Gpu,
    Api,
}

impl RunCategory {
    /// The task types claimable under this category.
    pub fn task_types(self) -> &'static [&'static str] {
        match self {
            Self::Gpu => GPU_TASK_TYPES,
            Self::Api => API_TASK_TYPES,
        }
    }
}

/// Whether a task type belongs to the orchestrator category.
pub fn is_orchestrator_type(task_type: &str) -> bool {
    ORCHESTRATOR_TASK_TYPES.contains(&task_type)
}
