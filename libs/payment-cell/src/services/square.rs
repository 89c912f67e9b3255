use std::time::Duration;

use reqwest::Client;
use serde_json::json;
use tracing::{debug, error, info};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::models::{
    ChargeOutcome, PaymentError, SquarePaymentResponse, SquareRefundResponse,
};

/// A charge the provider has not confirmed must never be treated as captured,
/// so the call carries a hard timeout and a timeout maps to `Unconfirmed`.
const CHARGE_TIMEOUT_SECS: u64 = 15;

/// Square Payments API client.
/// Based on: https://developer.squareup.com/reference/square/payments-api
#[derive(Debug)]
pub struct SquarePaymentsClient {
    client: Client,
    base_url: String,
    access_token: String,
}

impl SquarePaymentsClient {
    pub fn new(config: &AppConfig) -> Result<Self, PaymentError> {
        if !config.is_payments_configured() {
            return Err(PaymentError::NotConfigured);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(CHARGE_TIMEOUT_SECS))
            .build()
            .map_err(|e| PaymentError::Provider(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.square_base_url.clone(),
            access_token: config.square_access_token.clone(),
        })
    }

    /// Charge `amount` against a tokenized payment source.
    ///
    /// The idempotency key is minted fresh per attempt: provider-side retries
    /// of one attempt dedupe against each other, while distinct booking
    /// attempts are never deduplicated.
    /// POST /v2/payments
    pub async fn charge(
        &self,
        source_id: &str,
        amount: i64,
    ) -> Result<ChargeOutcome, PaymentError> {
        let idempotency_key = Uuid::new_v4();
        info!("Requesting Square charge of {} (key {})", amount, idempotency_key);

        let url = format!("{}/v2/payments", self.base_url);
        let request_body = json!({
            "source_id": source_id,
            "idempotency_key": idempotency_key,
            "amount_money": {
                "amount": amount,
                "currency": "USD"
            }
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.access_token))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                // Timed-out or failed transport: the outcome is unknown and
                // the booking must be treated as failed-unconfirmed.
                error!("Square charge did not complete: {}", e);
                PaymentError::Unconfirmed(e.to_string())
            })?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| PaymentError::Unconfirmed(e.to_string()))?;

        debug!("Square charge response: {} - {}", status, response_text);

        if !status.is_success() {
            error!("Square charge failed: {} - {}", status, response_text);
            return Err(PaymentError::Declined);
        }

        let payment_response: SquarePaymentResponse = serde_json::from_str(&response_text)
            .map_err(|e| PaymentError::Provider(format!("Failed to parse payment response: {}", e)))?;

        let payment = payment_response.payment;
        if payment.status != "COMPLETED" && payment.status != "APPROVED" {
            info!("Square charge not captured, status {}", payment.status);
            return Err(PaymentError::Declined);
        }

        info!("Square charge captured: {}", payment.id);
        Ok(ChargeOutcome {
            provider_payment_id: payment.id,
            amount: payment.amount_money.amount,
        })
    }

    /// Refund a captured charge. Compensation path for bookings whose
    /// persistence failed after the charge succeeded.
    /// POST /v2/refunds
    pub async fn refund(&self, provider_payment_id: &str, amount: i64) -> Result<String, PaymentError> {
        info!("Requesting Square refund for payment {}", provider_payment_id);

        let url = format!("{}/v2/refunds", self.base_url);
        let request_body = json!({
            "payment_id": provider_payment_id,
            "idempotency_key": Uuid::new_v4(),
            "amount_money": {
                "amount": amount,
                "currency": "USD"
            }
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.access_token))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| PaymentError::Provider(e.to_string()))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| PaymentError::Provider(e.to_string()))?;

        if !status.is_success() {
            error!("Square refund failed: {} - {}", status, response_text);
            return Err(PaymentError::Provider(format!(
                "HTTP {}: {}",
                status, response_text
            )));
        }

        let refund_response: SquareRefundResponse = serde_json::from_str(&response_text)
            .map_err(|e| PaymentError::Provider(format!("Failed to parse refund response: {}", e)))?;

        info!("Square refund accepted: {}", refund_response.refund.id);
        Ok(refund_response.refund.id)
    }
}
