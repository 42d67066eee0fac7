//! Task entity models and DTOs for the orchestration queue.

use medialoom_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::status::{StatusId, TaskStatus};

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `tasks` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Task {
    pub id: DbId,
    pub project_id: DbId,
    pub task_type: String,
    pub params: serde_json::Value,
    pub status_id: StatusId,
    /// Declaration-ordered predecessor task ids.
    pub dependant_on: Vec<DbId>,
    pub worker_id: Option<DbId>,
    pub generation_started_at: Option<Timestamp>,
    pub generation_processed_at: Option<Timestamp>,
    pub output_location: Option<String>,
    pub error_message: Option<String>,
    pub claimed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Create / list DTOs
// ---------------------------------------------------------------------------

/// DTO for enqueueing a new task via `POST /api/v1/tasks`.
#[derive(Debug, Deserialize)]
pub struct CreateTask {
    pub task_type: String,
    pub params: serde_json::Value,
    #[serde(default)]
    pub dependant_on: Vec<DbId>,
}

/// Query parameters for `GET /api/v1/tasks`.
#[derive(Debug, Default, Deserialize)]
pub struct TaskListQuery {
    /// Filter by status ID (e.g. 1 = queued, 2 = in progress).
    pub status_id: Option<StatusId>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}

// ---------------------------------------------------------------------------
// Dependency resolution
// ---------------------------------------------------------------------------

/// Status of one predecessor as seen by the resolver. `NotFound` is the
/// synthetic status for a dependency id with no task row; it never counts
/// as satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredecessorStatus {
    Queued,
    InProgress,
    Complete,
    Failed,
    Cancelled,
    NotFound,
}

impl PredecessorStatus {
    /// Map a stored status ID onto the resolver view.
    pub fn from_status_id(id: StatusId) -> Self {
        match id {
            id if id == TaskStatus::Queued.id() => Self::Queued,
            id if id == TaskStatus::InProgress.id() => Self::InProgress,
            id if id == TaskStatus::Complete.id() => Self::Complete,
            id if id == TaskStatus::Failed.id() => Self::Failed,
            id if id == TaskStatus::Cancelled.id() => Self::Cancelled,
            _ => Self::NotFound,
        }
    }
}

/// One resolved predecessor in declaration order.
#[derive(Debug, Clone, Serialize)]
pub struct Predecessor {
    pub predecessor_id: DbId,
    pub status: PredecessorStatus,
    pub output_location: Option<String>,
}

impl Predecessor {
    /// A dependency is satisfied only when Complete with an output present.
    pub fn is_satisfied(&self) -> bool {
        self.status == PredecessorStatus::Complete && self.output_location.is_some()
    }
}

/// Legacy single-value mirror of a resolution: the first-declared
/// predecessor's identity and status, with `output_location` withheld
/// unless every dependency is satisfied.
#[derive(Debug, Clone, Serialize)]
pub struct LegacyDependencyView {
    pub predecessor_id: Option<DbId>,
    pub status: Option<PredecessorStatus>,
    pub output_location: Option<String>,
}

/// Full resolver result for one task's dependency list.
#[derive(Debug, Clone, Serialize)]
pub struct DependencyResolution {
    pub predecessors: Vec<Predecessor>,
    pub all_complete: bool,
}

impl DependencyResolution {
    /// Build a resolution from predecessors in declaration order.
    /// A task with no dependencies resolves as satisfied.
    pub fn new(predecessors: Vec<Predecessor>) -> Self {
        let all_complete = predecessors.iter().all(Predecessor::is_satisfied);
        Self {
            predecessors,
            all_complete,
        }
    }

    /// The backward-compatible scalar projection. Derived here, once, so
    /// callers cannot recompute it with different gating rules.
    pub fn legacy_view(&self) -> LegacyDependencyView {
        let first = self.predecessors.first();
        LegacyDependencyView {
            predecessor_id: first.map(|p| p.predecessor_id),
            status: first.map(|p| p.status),
            output_location: if self.all_complete {
                first.and_then(|p| p.output_location.clone())
            } else {
                None
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Counts views
// ---------------------------------------------------------------------------

/// Headline totals for the counts endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct QueueTotals {
    /// Queued tasks currently passing the full admission predicate.
    pub queued_only: i64,
    /// Tasks currently InProgress.
    pub active_only: i64,
    pub queued_plus_active: i64,
}

/// Diagnostic breakdown over the caller's scope (read-only).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QueueBreakdown {
    pub queued_total: i64,
    pub in_progress_total: i64,
    pub in_progress_remote: i64,
    pub in_progress_unattributed: i64,
    pub orchestrator_in_progress: i64,
}

/// Per-user queue occupancy (service-identity callers only).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserQueueCount {
    pub user_id: DbId,
    pub email: String,
    pub queued: i64,
    pub in_progress: i64,
}

/// Compact recent-task row for counts diagnostics.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RecentTask {
    pub id: DbId,
    pub task_type: String,
    pub status_id: StatusId,
    pub created_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn predecessor(id: DbId, status: PredecessorStatus, output: Option<&str>) -> Predecessor {
        Predecessor {
            predecessor_id: id,
            status,
            output_location: output.map(str::to_string),
        }
    }

    #[test]
    fn empty_dependency_list_is_satisfied() {
        let resolution = DependencyResolution::new(vec![]);
        assert!(resolution.all_complete);
        let legacy = resolution.legacy_view();
        assert!(legacy.predecessor_id.is_none());
        assert!(legacy.output_location.is_none());
    }

    #[test]
    fn complete_without_output_is_not_satisfied() {
        let resolution = DependencyResolution::new(vec![predecessor(
            1,
            PredecessorStatus::Complete,
            None,
        )]);
        assert!(!resolution.all_complete);
    }

    #[test]
    fn legacy_view_withholds_output_until_all_complete() {
        // First dependency done, second still queued.
        let resolution = DependencyResolution::new(vec![
            predecessor(1, PredecessorStatus::Complete, Some("s3://out/1.mp4")),
            predecessor(2, PredecessorStatus::Queued, None),
        ]);
        assert!(!resolution.all_complete);

        let legacy = resolution.legacy_view();
        assert_eq!(legacy.predecessor_id, Some(1));
        assert_eq!(legacy.status, Some(PredecessorStatus::Complete));
        assert_eq!(legacy.output_location, None);
    }

    #[test]
    fn legacy_view_surfaces_first_output_when_all_complete() {
        let resolution = DependencyResolution::new(vec![
            predecessor(1, PredecessorStatus::Complete, Some("s3://out/1.mp4")),
            predecessor(2, PredecessorStatus::Complete, Some("s3://out/2.mp4")),
        ]);
        assert!(resolution.all_complete);

        let legacy = resolution.legacy_view();
        assert_eq!(legacy.output_location.as_deref(), Some("s3://out/1.mp4"));
    }

    #[test]
    fn missing_predecessor_fails_open_to_unsatisfied() {
        let resolution = DependencyResolution::new(vec![predecessor(
            99,
            PredecessorStatus::NotFound,
            None,
        )]);
        assert!(!resolution.all_complete);
    }
}
