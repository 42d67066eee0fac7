use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use medialoom_api::background::liveness_sweep::LivenessSweeper;
use medialoom_api::background::topup_sweep::TopupSweeper;
use medialoom_api::config::ServerConfig;
use medialoom_api::payments::HttpPaymentGateway;
use medialoom_api::router::build_app_router;
use medialoom_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "medialoom_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = medialoom_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    medialoom_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    medialoom_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Payment gateway ---
    let payments: Arc<dyn medialoom_api::payments::PaymentGateway> =
        Arc::new(HttpPaymentGateway::new(&config.payment));

    // --- Background sweeps ---
    let sweep_cancel = tokio_util::sync::CancellationToken::new();

    let topup_sweeper = TopupSweeper::new(
        pool.clone(),
        Arc::clone(&payments),
        config.topup_sweep_interval_secs,
    );
    let topup_cancel = sweep_cancel.clone();
    let topup_handle = tokio::spawn(async move {
        topup_sweeper.run(topup_cancel).await;
    });

    let liveness_sweeper = LivenessSweeper::new(pool.clone(), config.liveness_sweep_interval_secs);
    let liveness_cancel = sweep_cancel.clone();
    let liveness_handle = tokio::spawn(async move {
        liveness_sweeper.run(liveness_cancel).await;
    });

    tracing::info!("Background sweeps started (auto-top-up, worker liveness)");

    // --- App state and router ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        payments,
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    sweep_cancel.cancel();
    let grace = Duration::from_secs(config.shutdown_timeout_secs.min(5));
    let _ = tokio::time::timeout(grace, topup_handle).await;
    let _ = tokio::time::timeout(grace, liveness_handle).await;
    tracing::info!("Background sweeps stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
