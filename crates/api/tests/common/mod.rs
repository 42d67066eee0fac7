//! Shared helpers for API integration tests: test config, a mock payment
//! gateway, router construction, and request/seed utilities.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use medialoom_core::error::CoreError;
use medialoom_core::types::DbId;
use medialoom_db::models::ledger::{LedgerEntryType, RecordCredit};
use medialoom_db::models::project::{CreateProject, Project};
use medialoom_db::models::task::{CreateTask, Task};
use medialoom_db::models::user::{CreateUser, User};
use medialoom_db::models::worker::{RegisterWorker, Worker};
use medialoom_db::repositories::{LedgerRepo, ProjectRepo, TaskRepo, UserRepo, WorkerRepo};
use sqlx::PgPool;
use tower::ServiceExt;

use medialoom_api::auth::jwt::{generate_access_token, JwtConfig};
use medialoom_api::config::{PaymentConfig, ServerConfig};
use medialoom_api::payments::{ChargeOutcome, PaymentGateway};
use medialoom_api::router::build_app_router;
use medialoom_api::state::AppState;

/// Bearer token for the trusted service identity in tests.
pub const SERVICE_KEY: &str = "test-service-key";

/// HMAC secret for webhook signatures in tests.
pub const WEBHOOK_SECRET: &str = "whsec_test_0123456789";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 60,
        },
        service_key: SERVICE_KEY.to_string(),
        webhook_secret: WEBHOOK_SECRET.to_string(),
        payment: PaymentConfig {
            api_base: "http://127.0.0.1:1".to_string(),
            api_key: "pk_test_unused".to_string(),
            timeout_secs: 1,
        },
        topup_sweep_interval_secs: 3600,
        liveness_sweep_interval_secs: 60,
    }
}

// ---------------------------------------------------------------------------
// Mock payment gateway
// ---------------------------------------------------------------------------

/// Scripted gateway outcome for tests.
#[derive(Clone)]
pub enum MockCharge {
    Succeed,
    Decline(&'static str),
    Fail(&'static str),
}

/// Payment gateway double: returns a scripted outcome and counts calls.
pub struct MockGateway {
    behaviour: MockCharge,
    pub calls: AtomicUsize,
}

impl MockGateway {
    pub fn new(behaviour: MockCharge) -> Arc<Self> {
        Arc::new(Self {
            behaviour,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn charge_saved_method(
        &self,
        _customer_ref: &str,
        _payment_method_ref: &str,
        _amount_minor: i64,
        idempotency_key: &str,
    ) -> Result<ChargeOutcome, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behaviour {
            MockCharge::Succeed => Ok(ChargeOutcome::Succeeded {
                charge_id: format!("ch_{idempotency_key}"),
            }),
            MockCharge::Decline(reason) => Ok(ChargeOutcome::Declined {
                reason: reason.to_string(),
            }),
            MockCharge::Fail(error) => Err(CoreError::ExternalService(error.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// Build the full application router with the production middleware stack
/// and a gateway that always succeeds.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with_gateway(pool, MockGateway::new(MockCharge::Succeed))
}

/// Build the app with a scripted payment gateway.
pub fn build_test_app_with_gateway(pool: PgPool, gateway: Arc<MockGateway>) -> Router {
    let config = test_config();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        payments: gateway,
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// A user-bound bearer token signed with the test JWT secret.
pub fn user_token(user_id: DbId) -> String {
    generate_access_token(user_id, &test_config().jwt).expect("token generation should succeed")
}

/// Issue a GET with an optional bearer token.
pub async fn get(app: Router, path: &str, token: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder().method("GET").uri(path);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    app.oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// Issue a POST with a JSON body and an optional bearer token.
pub async fn post_json(
    app: Router,
    path: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    app.oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert a status and return the parsed body.
pub async fn expect_status(
    response: Response<Body>,
    status: StatusCode,
) -> serde_json::Value {
    assert_eq!(response.status(), status);
    body_json(response).await
}

// ---------------------------------------------------------------------------
// Seed helpers
// ---------------------------------------------------------------------------

/// Create a user with a ledger-granted starting balance.
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

pub async fn enqueue_task(
    pool: &PgPool,
    project: &Project,
    task_type: &str,
    params: serde_json::Value,
) -> Task {
    TaskRepo::create(
        pool,
        project.id,
        &CreateTask {
            task_type: task_type.to_string(),
            params,
            dependant_on: Vec::new(),
        },
    )
    .await
    .expect("task insert should succeed")
}
