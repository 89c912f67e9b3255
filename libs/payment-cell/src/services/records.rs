use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::{PaymentError, PaymentRecord};

/// Persists captured charges in the `payments` table. A payment row must
/// exist before the consultation row that references it.
pub struct PaymentRecordService<'a> {
    supabase: &'a SupabaseClient,
}

impl<'a> PaymentRecordService<'a> {
    pub fn new(supabase: &'a SupabaseClient) -> Self {
        Self { supabase }
    }

    pub async fn record_payment(
        &self,
        provider_payment_id: &str,
        amount: i64,
        auth_token: &str,
    ) -> Result<Uuid, PaymentError> {
        debug!("Recording captured payment {}", provider_payment_id);

        let payment_data = json!({
            "provider_payment_id": provider_payment_id,
            "amount": amount,
            "created_at": chrono::Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/payments",
                Some(auth_token),
                Some(payment_data),
                Some(headers),
            )
            .await
            .map_err(|e| PaymentError::Database(e.to_string()))?;

        if result.is_empty() {
            return Err(PaymentError::Database("Failed to record payment".to_string()));
        }

        let record: PaymentRecord = serde_json::from_value(result[0].clone())
            .map_err(|e| PaymentError::Database(format!("Failed to parse payment record: {}", e)))?;

        debug!("Payment recorded with id {}", record.id);
        Ok(record.id)
    }
}
