use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A captured charge as reported by the payment provider.
#[derive(Debug, Clone)]
pub struct ChargeOutcome {
    pub provider_payment_id: String,
    pub amount: i64,
}

/// Row in the `payments` table. Persisted after a successful charge and
/// referenced by the consultation that the charge paid for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub provider_payment_id: String,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

// Square API payloads. Only the fields the core needs from the contract.

#[derive(Debug, Deserialize)]
pub struct SquarePaymentResponse {
    pub payment: SquarePayment,
}

#[derive(Debug, Deserialize)]
pub struct SquarePayment {
    pub id: String,
    pub status: String,
    pub amount_money: SquareMoney,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SquareMoney {
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Deserialize)]
pub struct SquareRefundResponse {
    pub refund: SquareRefund,
}

#[derive(Debug, Deserialize)]
pub struct SquareRefund {
    pub id: String,
    pub status: String,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum PaymentError {
    #[error("Payment provider is not configured")]
    NotConfigured,

    #[error("Payment was declined by the provider")]
    Declined,

    #[error("Payment outcome unconfirmed: {0}")]
    Unconfirmed(String),

    #[error("Payment provider error: {0}")]
    Provider(String),

    #[error("Database error: {0}")]
    Database(String),
}
