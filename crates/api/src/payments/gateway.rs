//! Payment gateway trait and the HTTP implementation against the external
//! payment processor.
//!
//! The trait is the seam that keeps the top-up engine testable without a
//! live processor: `AppState` carries an `Arc<dyn PaymentGateway>` and
//! tests inject a mock. The HTTP implementation is the only code in the
//! system allowed to block on a third-party network round trip, so it
//! carries its own request timeout and must never be called while holding
//! a database transaction.

use async_trait::async_trait;
use medialoom_core::error::CoreError;
use serde::Deserialize;

use crate::config::PaymentConfig;

/// Result of charging a stored payment method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargeOutcome {
    /// The charge settled; a ledger credit may be recorded.
    Succeeded { charge_id: String },
    /// The processor refused the card (declined, expired). Terminal:
    /// retrying will not help, so auto-top-up is disabled for the user.
    Declined { reason: String },
}

/// Seam to the external payment processor.
///
/// Transient failures (network, 5xx, timeouts) surface as
/// [`CoreError::ExternalService`]; terminal card refusals surface as
/// [`ChargeOutcome::Declined`].
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charge a stored payment method for `amount_minor` minor units.
    async fn charge_saved_method(
        &self,
        customer_ref: &str,
        payment_method_ref: &str,
        amount_minor: i64,
        idempotency_key: &str,
    ) -> Result<ChargeOutcome, CoreError>;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// Charge statuses the processor reports as terminal card refusals.
pub const DECLINED_STATUSES: &[&str] = &["declined", "card_declined", "card_expired"];

/// Gateway talking to the processor's REST API.
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
}

/// Charge response body from the processor.
#[derive(Debug, Deserialize)]
struct ChargeResponse {
    id: String,
    status: String,
    #[serde(default)]
    failure_reason: Option<String>,
}

impl HttpPaymentGateway {
    /// Build a gateway from configuration.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be constructed, which is the
    /// desired behaviour at startup -- we want misconfiguration to fail fast.
    pub fn new(config: &PaymentConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to build payment HTTP client");
        Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn charge_saved_method(
        &self,
        customer_ref: &str,
        payment_method_ref: &str,
        amount_minor: i64,
        idempotency_key: &str,
    ) -> Result<ChargeOutcome, CoreError> {
        let url = format!("{}/v1/charges", self.api_base);
        let body = serde_json::json!({
            "customer": customer_ref,
            "payment_method": payment_method_ref,
            "amount": amount_minor,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("Idempotency-Key", idempotency_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CoreError::ExternalService(format!("charge request failed: {e}")))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(CoreError::ExternalService(format!(
                "payment processor returned {status}"
            )));
        }

        let charge: ChargeResponse = response
            .json()
            .await
            .map_err(|e| CoreError::ExternalService(format!("malformed charge response: {e}")))?;

        if charge.status == "succeeded" {
            return Ok(ChargeOutcome::Succeeded {
                charge_id: charge.id,
            });
        }

        if DECLINED_STATUSES.contains(&charge.status.as_str()) {
            return Ok(ChargeOutcome::Declined {
                reason: charge
                    .failure_reason
                    .unwrap_or_else(|| charge.status.clone()),
            });
        }

        Err(CoreError::ExternalService(format!(
            "unexpected charge status: {}",
            charge.status
        )))
    }
}
