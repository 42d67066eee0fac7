//! Shared seed helpers for db integration tests.

use medialoom_db::models::ledger::{LedgerEntryType, RecordCredit};
use medialoom_db::models::project::{CreateProject, Project};
use medialoom_db::models::task::{CreateTask, Task};
use medialoom_db::models::user::{CreateUser, User};
use medialoom_db::models::worker::{RegisterWorker, Worker};
use medialoom_db::repositories::{LedgerRepo, ProjectRepo, TaskRepo, UserRepo, WorkerRepo};
use sqlx::PgPool;

/// Create a user with a starting balance granted through the ledger, so the
/// cached column and the ledger sum agree from the start.
pub async fn seed_user(pool: &PgPool, email: &str, balance_minor: i64) -> User {
    let user = UserRepo::create(
        pool,
        &CreateUser {
            email: email.to_string(),
            display_name: email.split('@').next().unwrap().to_string(),
        },
    )
    .await
    .expect("user insert should succeed");

    if balance_minor != 0 {
        LedgerRepo::record_credit(
            pool,
            &RecordCredit {
                user_id: user.id,
                task_id: None,
                amount: balance_minor,
                entry_type: LedgerEntryType::Manual,
                metadata: serde_json::json!({ "reason": "test seed" }),
            },
        )
        .await
        .expect("seed credit should succeed");
    }

    user
}

pub async fn seed_project(pool: &PgPool, user: &User) -> Project {
    ProjectRepo::create(
        pool,
        user.id,
        &CreateProject {
            name: "test project".to_string(),
        },
    )
    .await
    .expect("project insert should succeed")
}

pub async fn seed_worker(pool: &PgPool, name: &str) -> Worker {
    WorkerRepo::register(
        pool,
        &RegisterWorker {
            name: name.to_string(),
            hostname: "test-host".to_string(),
            metadata: None,
        },
    )
    .await
    .expect("worker registration should succeed")
}

/// Enqueue a task with the given type and dependencies.
pub async fn enqueue_task(
    pool: &PgPool,
    project: &Project,
    task_type: &str,
    dependant_on: Vec<i64>,
) -> Task {
    TaskRepo::create(
        pool,
        project.id,
        &CreateTask {
            task_type: task_type.to_string(),
            params: serde_json::json!({ "prompt": "a red fox at dawn" }),
            dependant_on,
        },
    )
    .await
    .expect("task insert should succeed")
}
