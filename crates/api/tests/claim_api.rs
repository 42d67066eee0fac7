//! Integration tests for the claim endpoint and task lifecycle over HTTP.

mod common;

use axum::http::StatusCode;
use common::{
    enqueue_task, expect_status, post_json, seed_project, seed_user, seed_worker, user_token,
    SERVICE_KEY,
};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Claim hands out a task, then reports no work
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn claim_returns_task_then_no_work(pool: PgPool) {
    let user = seed_user(&pool, "alice@example.com", 10_000).await;
    let project = seed_project(&pool, &user).await;
    let worker = seed_worker(&pool, "gpu-01").await;
    let task = enqueue_task(
        &pool,
        &project,
        "video_generation",
        serde_json::json!({ "prompt": "a red fox at dawn" }),
    )
    .await;

    let app = common::build_test_app(pool);

    let response = post_json(
        app.clone(),
        "/api/v1/claim",
        Some(SERVICE_KEY),
        serde_json::json!({ "worker_id": worker.id }),
    )
    .await;
    let json = expect_status(response, StatusCode::OK).await;
    assert_eq!(json["data"]["id"], task.id);
    assert_eq!(json["data"]["worker_id"], worker.id);

    // Nothing left: explicit empty result, not an error.
    let response = post_json(
        app,
        "/api/v1/claim",
        Some(SERVICE_KEY),
        serde_json::json!({ "worker_id": worker.id }),
    )
    .await;
    let json = expect_status(response, StatusCode::OK).await;
    assert!(json["data"].is_null());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn claim_with_unknown_worker_is_not_found(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = post_json(
        app,
        "/api/v1/claim",
        Some(SERVICE_KEY),
        serde_json::json!({ "worker_id": 999 }),
    )
    .await;
    expect_status(response, StatusCode::NOT_FOUND).await;
}

#[sqlx::test(migrations = "../db/migrations")]
async fn run_type_filter_applies_over_http(pool: PgPool) {
    let user = seed_user(&pool, "alice@example.com", 10_000).await;
    let project = seed_project(&pool, &user).await;
    let worker = seed_worker(&pool, "api-01").await;
    enqueue_task(&pool, &project, "video_generation", serde_json::json!({})).await;

    let app = common::build_test_app(pool);

    // Only a GPU-class task is queued; an api-class claim sees no work.
    let response = post_json(
        app,
        "/api/v1/claim",
        Some(SERVICE_KEY),
        serde_json::json!({ "worker_id": worker.id, "run_type": "api" }),
    )
    .await;
    let json = expect_status(response, StatusCode::OK).await;
    assert!(json["data"].is_null());
}

// ---------------------------------------------------------------------------
// Task creation and dependency validation over HTTP
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn create_task_validates_fields_and_dependencies(pool: PgPool) {
    let user = seed_user(&pool, "alice@example.com", 10_000).await;
    let project = seed_project(&pool, &user).await;
    let token = user_token(user.id);

    let app = common::build_test_app(pool);

    // Missing task_type.
    let response = post_json(
        app.clone(),
        "/api/v1/tasks",
        Some(&token),
        serde_json::json!({
            "project_id": project.id,
            "task_type": "",
            "params": { "prompt": "x" },
        }),
    )
    .await;
    expect_status(response, StatusCode::BAD_REQUEST).await;

    // Dependency that does not exist in this tenant's scope.
    let response = post_json(
        app.clone(),
        "/api/v1/tasks",
        Some(&token),
        serde_json::json!({
            "project_id": project.id,
            "task_type": "video_generation",
            "params": { "prompt": "x" },
            "dependant_on": [987654],
        }),
    )
    .await;
    let json = expect_status(response, StatusCode::BAD_REQUEST).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");

    // Well-formed request succeeds.
    let response = post_json(
        app,
        "/api/v1/tasks",
        Some(&token),
        serde_json::json!({
            "project_id": project.id,
            "task_type": "video_generation",
            "params": { "prompt": "x" },
        }),
    )
    .await;
    let json = expect_status(response, StatusCode::CREATED).await;
    assert_eq!(json["data"]["status_id"], 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn users_cannot_create_tasks_in_foreign_projects(pool: PgPool) {
    let alice = seed_user(&pool, "alice@example.com", 10_000).await;
    let bob = seed_user(&pool, "bob@example.com", 10_000).await;
    let alice_project = seed_project(&pool, &alice).await;
    let token = user_token(bob.id);

    let app = common::build_test_app(pool);
    let response = post_json(
        app,
        "/api/v1/tasks",
        Some(&token),
        serde_json::json!({
            "project_id": alice_project.id,
            "task_type": "video_generation",
            "params": {},
        }),
    )
    .await;
    expect_status(response, StatusCode::FORBIDDEN).await;
}

// ---------------------------------------------------------------------------
// Completion transitions and conflicts over HTTP
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn complete_requires_a_claimed_task(pool: PgPool) {
    let user = seed_user(&pool, "alice@example.com", 10_000).await;
    let project = seed_project(&pool, &user).await;
    let task = enqueue_task(&pool, &project, "video_generation", serde_json::json!({})).await;

    let app = common::build_test_app(pool);

    // Still queued: completing skips InProgress, which is not a legal edge.
    let response = post_json(
        app,
        &format!("/api/v1/tasks/{}/complete", task.id),
        Some(SERVICE_KEY),
        serde_json::json!({ "output_location": "s3://outputs/x.mp4" }),
    )
    .await;
    let json = expect_status(response, StatusCode::CONFLICT).await;
    assert_eq!(json["code"], "CONFLICT");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn cancelling_a_claimed_task_conflicts(pool: PgPool) {
    let user = seed_user(&pool, "alice@example.com", 10_000).await;
    let project = seed_project(&pool, &user).await;
    let worker = seed_worker(&pool, "gpu-01").await;
    let task = enqueue_task(&pool, &project, "video_generation", serde_json::json!({})).await;
    let token = user_token(user.id);

    let app = common::build_test_app(pool);

    post_json(
        app.clone(),
        "/api/v1/claim",
        Some(SERVICE_KEY),
        serde_json::json!({ "worker_id": worker.id }),
    )
    .await;

    let response = post_json(
        app,
        &format!("/api/v1/tasks/{}/cancel", task.id),
        Some(&token),
        serde_json::json!({}),
    )
    .await;
    expect_status(response, StatusCode::CONFLICT).await;
}

// ---------------------------------------------------------------------------
// Dependencies endpoint
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn dependencies_endpoint_reports_gating_and_legacy_mirror(pool: PgPool) {
    let user = seed_user(&pool, "alice@example.com", 10_000).await;
    let project = seed_project(&pool, &user).await;
    let worker = seed_worker(&pool, "gpu-01").await;
    let token = user_token(user.id);

    let dep = enqueue_task(&pool, &project, "image_generation", serde_json::json!({})).await;
    let pending = enqueue_task(&pool, &project, "image_generation", serde_json::json!({})).await;

    // Finish the first dependency.
    let app = common::build_test_app(pool.clone());
    post_json(
        app.clone(),
        "/api/v1/claim",
        Some(SERVICE_KEY),
        serde_json::json!({ "worker_id": worker.id }),
    )
    .await;
    post_json(
        app.clone(),
        &format!("/api/v1/tasks/{}/complete", dep.id),
        Some(SERVICE_KEY),
        serde_json::json!({ "output_location": "s3://outputs/dep.png" }),
    )
    .await;

    let task = enqueue_task(
        &pool,
        &project,
        "video_generation",
        serde_json::json!({ "prompt": "x" }),
    )
    .await;
    sqlx::query("UPDATE tasks SET dependant_on = ARRAY[$2, $3]::bigint[] WHERE id = $1")
        .bind(task.id)
        .bind(dep.id)
        .bind(pending.id)
        .execute(&pool)
        .await
        .unwrap();

    let response = common::get(
        app,
        &format!("/api/v1/tasks/{}/dependencies", task.id),
        Some(&token),
    )
    .await;
    let json = expect_status(response, StatusCode::OK).await;

    assert_eq!(json["data"]["all_complete"], false);
    assert_eq!(json["data"]["predecessors"][0]["status"], "complete");
    assert_eq!(json["data"]["predecessors"][1]["status"], "queued");
    // Legacy mirror: first dependency's identity, but output withheld.
    assert_eq!(json["data"]["predecessor_id"], dep.id);
    assert_eq!(json["data"]["status"], "complete");
    assert!(json["data"]["output_location"].is_null());
}
