use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development except
/// the secrets, which must be set explicitly.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Graceful shutdown timeout in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// JWT token configuration (secret, expiry duration).
    pub jwt: JwtConfig,
    /// Shared secret identifying the trusted service identity.
    pub service_key: String,
    /// HMAC secret for payment webhook signatures.
    pub webhook_secret: String,
    /// Payment processor configuration.
    pub payment: PaymentConfig,
    /// Seconds between auto-top-up sweep runs (default: `3600`).
    pub topup_sweep_interval_secs: u64,
    /// Seconds between worker liveness sweep runs (default: `60`).
    pub liveness_sweep_interval_secs: u64,
}

/// Connection settings for the external payment processor.
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// Base URL of the processor API (default: `https://api.payments.dev`).
    pub api_base: String,
    /// Bearer key for the processor API.
    pub api_key: String,
    /// Request timeout for processor calls in seconds (default: `10`).
    pub timeout_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Required | Default                 |
    /// |-------------------------------|----------|-------------------------|
    /// | `HOST`                        | no       | `0.0.0.0`               |
    /// | `PORT`                        | no       | `3000`                  |
    /// | `CORS_ORIGINS`                | no       | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`        | no       | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`       | no       | `30`                    |
    /// | `SERVICE_API_KEY`             | **yes**  | --                      |
    /// | `WEBHOOK_SIGNING_SECRET`      | **yes**  | --                      |
    /// | `PAYMENT_API_BASE`            | no       | `https://api.payments.dev` |
    /// | `PAYMENT_API_KEY`             | **yes**  | --                      |
    /// | `PAYMENT_TIMEOUT_SECS`        | no       | `10`                    |
    /// | `TOPUP_SWEEP_INTERVAL_SECS`   | no       | `3600`                  |
    /// | `LIVENESS_SWEEP_INTERVAL_SECS`| no       | `60`                    |
    ///
    /// # Panics
    ///
    /// Panics if a required variable is missing or a numeric one is invalid;
    /// misconfiguration should fail fast at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let service_key = std::env::var("SERVICE_API_KEY")
            .expect("SERVICE_API_KEY must be set in the environment");
        assert!(!service_key.is_empty(), "SERVICE_API_KEY must not be empty");

        let webhook_secret = std::env::var("WEBHOOK_SIGNING_SECRET")
            .expect("WEBHOOK_SIGNING_SECRET must be set in the environment");
        assert!(
            !webhook_secret.is_empty(),
            "WEBHOOK_SIGNING_SECRET must not be empty"
        );

        let payment = PaymentConfig {
            api_base: std::env::var("PAYMENT_API_BASE")
                .unwrap_or_else(|_| "https://api.payments.dev".into()),
            api_key: std::env::var("PAYMENT_API_KEY")
                .expect("PAYMENT_API_KEY must be set in the environment"),
            timeout_secs: std::env::var("PAYMENT_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".into())
                .parse()
                .expect("PAYMENT_TIMEOUT_SECS must be a valid u64"),
        };

        let topup_sweep_interval_secs: u64 = std::env::var("TOPUP_SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| "3600".into())
            .parse()
            .expect("TOPUP_SWEEP_INTERVAL_SECS must be a valid u64");

        let liveness_sweep_interval_secs: u64 = std::env::var("LIVENESS_SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("LIVENESS_SWEEP_INTERVAL_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            jwt: JwtConfig::from_env(),
            service_key,
            webhook_secret,
            payment,
            topup_sweep_interval_secs,
            liveness_sweep_interval_secs,
        }
    }
}
