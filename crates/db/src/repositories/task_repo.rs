//! Repository for the `tasks` table.
//!
//! Uses the `TaskStatus` enum from `models::status` for all status
//! transitions. No magic numbers — every status literal is a named constant
//! interpolated through `format!`.
//!
//! The claim path is the one true mutual-exclusion point in the system:
//! `UPDATE ... WHERE id = (SELECT ... FOR UPDATE SKIP LOCKED)` guarantees
//! two racing workers can never both receive the same task.

use std::collections::HashMap;

use medialoom_core::lifecycle::MAX_CONCURRENT_TASKS_PER_USER;
use medialoom_core::run_types::ORCHESTRATOR_TASK_TYPES;
use medialoom_core::types::DbId;
use sqlx::PgPool;

use crate::models::status::{StatusId, TaskStatus};
use crate::models::task::{
    CreateTask, DependencyResolution, Predecessor, PredecessorStatus, QueueBreakdown, RecentTask,
    Task, TaskListQuery, UserQueueCount,
};

/// Column list for `tasks` queries.
const COLUMNS: &str = "\
    id, project_id, task_type, params, status_id, dependant_on, worker_id, \
    generation_started_at, generation_processed_at, output_location, \
    error_message, claimed_at, created_at, updated_at";

/// Maximum page size for task listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for task listing.
const DEFAULT_LIMIT: i64 = 50;

/// Number of rows returned by the recent-tasks diagnostic.
const RECENT_LIMIT: i64 = 20;

const QUEUED: StatusId = TaskStatus::Queued as StatusId;
const IN_PROGRESS: StatusId = TaskStatus::InProgress as StatusId;
const COMPLETE: StatusId = TaskStatus::Complete as StatusId;
const FAILED: StatusId = TaskStatus::Failed as StatusId;
const CANCELLED: StatusId = TaskStatus::Cancelled as StatusId;

/// Admission predicate shared by the claim and eligible-count queries.
///
/// `scope`, `types`, `orch`, and `cap` are bind placeholders: optional user
/// scope (NULL = service-wide), optional run-category task types, the
/// orchestrator type set, and the per-user concurrency cap. A queued task is
/// eligible when its owner is active, every dependency is Complete with an
/// output present (a missing dependency row fails open to "not satisfied"),
/// the owner's non-orchestrator InProgress count is under the cap, and the
/// owner's ledger-derived balance is strictly positive.
fn eligibility_clause(scope: &str, types: &str, orch: &str, cap: &str) -> String {
    format!(
        "t.status_id = {QUEUED} \
         AND u.is_active \
         AND ({scope}::bigint IS NULL OR p.user_id = {scope}) \
         AND ({types}::text[] IS NULL OR t.task_type = ANY({types})) \
         AND NOT EXISTS ( \
             SELECT 1 FROM unnest(t.dependant_on) AS dep(id) \
             LEFT JOIN tasks d ON d.id = dep.id \
             WHERE d.id IS NULL \
                OR d.status_id <> {COMPLETE} \
                OR d.output_location IS NULL \
         ) \
         AND ( \
             SELECT COUNT(*) FROM tasks a \
             JOIN projects ap ON ap.id = a.project_id \
             WHERE ap.user_id = p.user_id \
               AND a.status_id = {IN_PROGRESS} \
               AND NOT (a.task_type = ANY({orch})) \
         ) < {cap} \
         AND ( \
             SELECT COALESCE(SUM(l.amount), 0) FROM credits_ledger l \
             WHERE l.user_id = p.user_id \
         ) > 0"
    )
}

fn orchestrator_types() -> Vec<String> {
    ORCHESTRATOR_TASK_TYPES.iter().map(|s| s.to_string()).collect()
}

/// Provides queue operations for tasks.
pub struct TaskRepo;

impl TaskRepo {
    // ── Creation ─────────────────────────────────────────────────────────

    /// Insert a new queued task.
    ///
    /// Dependency scope validation happens in the handler via
    /// [`Self::count_in_user_scope`] before this runs.
    pub async fn create(
        pool: &PgPool,
        project_id: DbId,
        input: &CreateTask,
    ) -> Result<Task, sqlx::Error> {
        let query = format!(
            "INSERT INTO tasks (project_id, task_type, params, status_id, dependant_on) \
             VALUES ($1, $2, $3, {QUEUED}, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(project_id)
            .bind(&input.task_type)
            .bind(&input.params)
            .bind(&input.dependant_on)
            .fetch_one(pool)
            .await
    }

    /// Count how many of `task_ids` resolve to tasks owned by `user_id`.
    ///
    /// Used to reject dependency lists referencing another tenant's tasks
    /// (or tasks that do not exist at all).
    pub async fn count_in_user_scope(
        pool: &PgPool,
        user_id: DbId,
        task_ids: &[DbId],
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(DISTINCT t.id) FROM tasks t \
             JOIN projects p ON p.id = t.project_id \
             WHERE t.id = ANY($1) AND p.user_id = $2",
        )
        .bind(task_ids)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    // ── Queries ──────────────────────────────────────────────────────────

    /// Find a task by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Task>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tasks WHERE id = $1");
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List tasks, optionally scoped to one user, with status filter and
    /// pagination. When `scope_user` is `None`, returns all tasks
    /// (service-identity view).
    pub async fn list(
        pool: &PgPool,
        scope_user: Option<DbId>,
        params: &TaskListQuery,
    ) -> Result<Vec<Task>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let offset = params.offset.unwrap_or(0);

        // Build the WHERE clause and track the next bind parameter index.
        let mut conditions: Vec<String> = Vec::new();
        let mut bind_idx: u32 = 1;

        if scope_user.is_some() {
            conditions.push(format!(
                "project_id IN (SELECT id FROM projects WHERE user_id = ${bind_idx})"
            ));
            bind_idx += 1;
        }

        if params.status_id.is_some() {
            conditions.push(format!("status_id = ${bind_idx}"));
            bind_idx += 1;
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT {COLUMNS} FROM tasks \
             {where_clause} \
             ORDER BY created_at DESC \
             LIMIT ${bind_idx} OFFSET ${}",
            bind_idx + 1,
        );

        let mut q = sqlx::query_as::<_, Task>(&query);

        if let Some(uid) = scope_user {
            q = q.bind(uid);
        }
        if let Some(sid) = params.status_id {
            q = q.bind(sid);
        }

        q = q.bind(limit).bind(offset);

        q.fetch_all(pool).await
    }

    // ── Claim protocol ───────────────────────────────────────────────────

    /// Atomically claim the oldest eligible queued task for a worker.
    ///
    /// `scope_user` restricts visibility to one user's projects (user-token
    /// callers); `run_types` restricts claimable task types to a run
    /// category. Returns `None` when no eligible task exists -- an explicit
    /// "no work" result, not an error. The `FOR UPDATE SKIP LOCKED`
    /// selection plus the `status_id = Queued` guard on the outer UPDATE
    /// make double-claims impossible under concurrency.
    pub async fn claim_next(
        pool: &PgPool,
        worker_id: DbId,
        scope_user: Option<DbId>,
        run_types: Option<Vec<String>>,
    ) -> Result<Option<Task>, sqlx::Error> {
        let query = format!(
            "UPDATE tasks \
             SET status_id = {IN_PROGRESS}, worker_id = $1, claimed_at = NOW(), \
                 generation_started_at = NOW(), updated_at = NOW() \
             WHERE id = ( \
                 SELECT t.id FROM tasks t \
                 JOIN projects p ON p.id = t.project_id \
                 JOIN users u ON u.id = p.user_id \
                 WHERE {eligible} \
                 ORDER BY t.created_at ASC \
                 LIMIT 1 \
                 FOR UPDATE OF t SKIP LOCKED \
             ) AND status_id = {QUEUED} \
             RETURNING {COLUMNS}",
            eligible = eligibility_clause("$2", "$3", "$4", "$5"),
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(worker_id)
            .bind(scope_user)
            .bind(run_types)
            .bind(orchestrator_types())
            .bind(MAX_CONCURRENT_TASKS_PER_USER)
            .fetch_optional(pool)
            .await
    }

    // ── Transitions ──────────────────────────────────────────────────────

    /// Mark an InProgress task Complete with its output location.
    ///
    /// Returns `None` if the task was not InProgress at commit time (the
    /// transition lost a race or was invalid); the caller reports a
    /// conflict rather than overwriting a terminal state.
    pub async fn complete(
        pool: &PgPool,
        id: DbId,
        output_location: &str,
    ) -> Result<Option<Task>, sqlx::Error> {
        let query = format!(
            "UPDATE tasks \
             SET status_id = {COMPLETE}, generation_processed_at = NOW(), \
                 output_location = $2, updated_at = NOW() \
             WHERE id = $1 AND status_id = {IN_PROGRESS} \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(output_location)
            .fetch_optional(pool)
            .await
    }

    /// Mark an InProgress task Failed with an error message.
    pub async fn fail(
        pool: &PgPool,
        id: DbId,
        error: &str,
    ) -> Result<Option<Task>, sqlx::Error> {
        let query = format!(
            "UPDATE tasks \
             SET status_id = {FAILED}, generation_processed_at = NOW(), \
                 error_message = $2, updated_at = NOW() \
             WHERE id = $1 AND status_id = {IN_PROGRESS} \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(error)
            .fetch_optional(pool)
            .await
    }

    /// Cancel a task that is still Queued.
    ///
    /// Returns `false` if the task had already been claimed or reached a
    /// terminal state. InProgress tasks cannot be cancelled (no preemption
    /// protocol).
    pub async fn cancel(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(&format!(
            "UPDATE tasks SET status_id = {CANCELLED}, updated_at = NOW() \
             WHERE id = $1 AND status_id = {QUEUED}"
        ))
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // ── Dependency resolution ────────────────────────────────────────────

    /// Resolve a task's predecessors in declaration order.
    ///
    /// Dependency ids with no task row resolve to the synthetic
    /// `not_found` status, which never satisfies the gate.
    pub async fn resolve_dependencies(
        pool: &PgPool,
        task: &Task,
    ) -> Result<DependencyResolution, sqlx::Error> {
        if task.dependant_on.is_empty() {
            return Ok(DependencyResolution::new(Vec::new()));
        }

        let rows: Vec<(DbId, StatusId, Option<String>)> = sqlx::query_as(
            "SELECT id, status_id, output_location FROM tasks WHERE id = ANY($1)",
        )
        .bind(&task.dependant_on)
        .fetch_all(pool)
        .await?;

        let by_id: HashMap<DbId, (StatusId, Option<String>)> = rows
            .into_iter()
            .map(|(id, status_id, output)| (id, (status_id, output)))
            .collect();

        let predecessors = task
            .dependant_on
            .iter()
            .map(|dep_id| match by_id.get(dep_id) {
                Some((status_id, output)) => Predecessor {
                    predecessor_id: *dep_id,
                    status: PredecessorStatus::from_status_id(*status_id),
                    output_location: output.clone(),
                },
                None => Predecessor {
                    predecessor_id: *dep_id,
                    status: PredecessorStatus::NotFound,
                    output_location: None,
                },
            })
            .collect();

        Ok(DependencyResolution::new(predecessors))
    }

    // ── Counts (read-only diagnostics) ───────────────────────────────────

    /// Count queued tasks currently passing the full admission predicate.
    pub async fn count_eligible(
        pool: &PgPool,
        scope_user: Option<DbId>,
        run_types: Option<Vec<String>>,
    ) -> Result<i64, sqlx::Error> {
        let query = format!(
            "SELECT COUNT(*) FROM tasks t \
             JOIN projects p ON p.id = t.project_id \
             JOIN users u ON u.id = p.user_id \
             WHERE {eligible}",
            eligible = eligibility_clause("$1", "$2", "$3", "$4"),
        );
        sqlx::query_scalar::<_, i64>(&query)
            .bind(scope_user)
            .bind(run_types)
            .bind(orchestrator_types())
            .bind(MAX_CONCURRENT_TASKS_PER_USER)
            .fetch_one(pool)
            .await
    }

    /// Aggregate queue diagnostics over the caller's scope.
    pub async fn breakdown(
        pool: &PgPool,
        scope_user: Option<DbId>,
        run_types: Option<Vec<String>>,
    ) -> Result<QueueBreakdown, sqlx::Error> {
        let query = format!(
            "SELECT \
                 COUNT(*) FILTER (WHERE t.status_id = {QUEUED}) AS queued_total, \
                 COUNT(*) FILTER (WHERE t.status_id = {IN_PROGRESS}) AS in_progress_total, \
                 COUNT(*) FILTER (WHERE t.status_id = {IN_PROGRESS} \
                     AND t.worker_id IS NOT NULL) AS in_progress_remote, \
                 COUNT(*) FILTER (WHERE t.status_id = {IN_PROGRESS} \
                     AND t.worker_id IS NULL) AS in_progress_unattributed, \
                 COUNT(*) FILTER (WHERE t.status_id = {IN_PROGRESS} \
                     AND t.task_type = ANY($3)) AS orchestrator_in_progress \
             FROM tasks t \
             JOIN projects p ON p.id = t.project_id \
             WHERE ($1::bigint IS NULL OR p.user_id = $1) \
               AND ($2::text[] IS NULL OR t.task_type = ANY($2))"
        );
        sqlx::query_as::<_, QueueBreakdown>(&query)
            .bind(scope_user)
            .bind(run_types)
            .bind(orchestrator_types())
            .fetch_one(pool)
            .await
    }

    /// Per-user queue occupancy (service-identity callers only).
    pub async fn per_user_counts(pool: &PgPool) -> Result<Vec<UserQueueCount>, sqlx::Error> {
        let query = format!(
            "SELECT u.id AS user_id, u.email, \
                 COUNT(*) FILTER (WHERE t.status_id = {QUEUED}) AS queued, \
                 COUNT(*) FILTER (WHERE t.status_id = {IN_PROGRESS}) AS in_progress \
             FROM tasks t \
             JOIN projects p ON p.id = t.project_id \
             JOIN users u ON u.id = p.user_id \
             GROUP BY u.id, u.email \
             ORDER BY in_progress DESC, queued DESC"
        );
        sqlx::query_as::<_, UserQueueCount>(&query)
            .fetch_all(pool)
            .await
    }

    /// Most recent tasks in the caller's scope, newest first.
    pub async fn recent(
        pool: &PgPool,
        scope_user: Option<DbId>,
    ) -> Result<Vec<RecentTask>, sqlx::Error> {
        let query = "SELECT t.id, t.task_type, t.status_id, t.created_at \
             FROM tasks t \
             JOIN projects p ON p.id = t.project_id \
             WHERE ($1::bigint IS NULL OR p.user_id = $1) \
             ORDER BY t.created_at DESC \
             LIMIT $2";
        sqlx::query_as::<_, RecentTask>(query)
            .bind(scope_user)
            .bind(RECENT_LIMIT)
            .fetch_all(pool)
            .await
    }
}
