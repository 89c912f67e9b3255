use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// CORE CONSULTATION MODELS
// ==============================================================================

/// A booked consultation. The unit of truth for "is this doctor/patient
/// busy": only rows with status `pending` block a slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consultation {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    /// References a payment row recorded from a captured charge. The charge
    /// always precedes this row, never the reverse.
    pub payment_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub fee: i64,
    pub room_id: Option<String>,
    pub prescription_url: Option<String>,
    pub status: ConsultationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsultationStatus {
    Pending,
    Completed,
}

impl fmt::Display for ConsultationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsultationStatus::Pending => write!(f, "pending"),
            ConsultationStatus::Completed => write!(f, "completed"),
        }
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSlotRequest {
    pub doctor_id: Uuid,
    /// `[start, end]` of the requested window; validated into a `SlotWindow`
    /// at the handler boundary.
    pub slot: (DateTime<Utc>, DateTime<Utc>),
    /// Tokenized payment source to charge.
    pub source_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckSlotRequest {
    pub doctor_id: Uuid,
    pub slot: (DateTime<Utc>, DateTime<Utc>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleRequest {
    pub consultation_id: Uuid,
    pub slot: (DateTime<Utc>, DateTime<Utc>),
}

// ==============================================================================
// ROLE-SPECIFIC VIEWS
// ==============================================================================

/// What a doctor sees in their consultation list: the patient across the
/// table, never the payment or the doctor's own row data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorConsultationView {
    pub consultation_id: Uuid,
    pub patient_name: String,
    pub patient_profile_url: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ConsultationStatus,
}

/// What a patient sees: the doctor's public identity and specialty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientConsultationView {
    pub consultation_id: Uuid,
    pub doctor_name: String,
    pub doctor_specialty: String,
    pub doctor_profile_url: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ConsultationStatus,
}

/// Room handle returned when a participant joins a consultation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinInfo {
    pub room_id: String,
    pub token: String,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum ConsultationError {
    #[error("Consultation not found")]
    NotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Slot not available")]
    SlotUnavailable,

    #[error("Doctor has no consultation fee configured")]
    MissingFee,

    #[error("Invalid slot: {0}")]
    InvalidSlot(String),

    #[error("Payment failed")]
    PaymentFailed,

    #[error("You have exceeded the time to reschedule")]
    TooLateToReschedule,

    #[error("You can only join 10 minutes before the consultation starts")]
    JoinWindowNotOpen,

    #[error("Unauthorized access to consultation")]
    Unauthorized,

    #[error("Database error: {0}")]
    Database(String),

    #[error("External service error: {0}")]
    Provider(String),
}
