//! Integration tests for credential resolution: service key, user tokens,
//! and the unauthorized/forbidden split.

mod common;

use axum::http::StatusCode;
use common::{expect_status, get, seed_user, user_token, SERVICE_KEY};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Missing / malformed credentials -> 401
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn missing_authorization_header_is_unauthorized(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get(app, "/api/v1/counts", None).await;
    let json = expect_status(response, StatusCode::UNAUTHORIZED).await;
    assert_eq!(json["code"], "UNAUTHORIZED");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn garbage_token_is_unauthorized(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get(app, "/api/v1/counts", Some("not-a-real-token")).await;
    let json = expect_status(response, StatusCode::UNAUTHORIZED).await;
    assert_eq!(json["code"], "UNAUTHORIZED");
}

// ---------------------------------------------------------------------------
// Valid token, no active principal -> 403
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn token_for_nonexistent_user_is_forbidden(pool: PgPool) {
    let app = common::build_test_app(pool);
    // Well-signed token whose subject has no user row.
    let token = user_token(424242);
    let response = get(app, "/api/v1/counts", Some(&token)).await;
    let json = expect_status(response, StatusCode::FORBIDDEN).await;
    assert_eq!(json["code"], "FORBIDDEN");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn token_for_deactivated_user_is_forbidden(pool: PgPool) {
    let user = seed_user(&pool, "gone@example.com", 0).await;
    sqlx::query("UPDATE users SET is_active = FALSE WHERE id = $1")
        .bind(user.id)
        .execute(&pool)
        .await
        .unwrap();

    let app = common::build_test_app(pool);
    let token = user_token(user.id);
    let response = get(app, "/api/v1/counts", Some(&token)).await;
    expect_status(response, StatusCode::FORBIDDEN).await;
}

// ---------------------------------------------------------------------------
// Scope enforcement
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn service_key_gets_global_counts_with_user_breakdown(pool: PgPool) {
    seed_user(&pool, "alice@example.com", 1_000).await;

    let app = common::build_test_app(pool);
    let response = get(app, "/api/v1/counts", Some(SERVICE_KEY)).await;
    let json = expect_status(response, StatusCode::OK).await;

    assert!(json["data"]["users"].is_array());
    assert!(json["data"]["totals"]["queued_only"].is_number());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn user_token_counts_omit_the_per_user_breakdown(pool: PgPool) {
    let user = seed_user(&pool, "alice@example.com", 1_000).await;

    let app = common::build_test_app(pool);
    let token = user_token(user.id);
    let response = get(app, "/api/v1/counts", Some(&token)).await;
    let json = expect_status(response, StatusCode::OK).await;

    assert!(json["data"]["users"].is_null());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn worker_endpoints_reject_user_tokens(pool: PgPool) {
    let user = seed_user(&pool, "alice@example.com", 1_000).await;

    let app = common::build_test_app(pool);
    let token = user_token(user.id);
    let response = get(app, "/api/v1/workers", Some(&token)).await;
    let json = expect_status(response, StatusCode::FORBIDDEN).await;
    assert_eq!(json["code"], "FORBIDDEN");
}
