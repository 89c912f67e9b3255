use std::sync::Arc;

use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;
use shared_schedule::SlotWindow;

use crate::models::{Consultation, ConsultationError, ConsultationStatus};

/// Everything the booking flow persists about a new consultation. The window
/// arrives pre-validated and the payment row already exists.
#[derive(Debug, Clone)]
pub struct NewConsultation {
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub payment_id: Uuid,
    pub window: SlotWindow,
    pub fee: i64,
}

/// Access to the `consultations` table. Readers never mutate; each writer
/// touches exactly one row.
pub struct ConsultationStore {
    supabase: Arc<SupabaseClient>,
}

impl ConsultationStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn create(
        &self,
        data: NewConsultation,
        auth_token: &str,
    ) -> Result<Uuid, ConsultationError> {
        let consultation_data = json!({
            "doctor_id": data.doctor_id,
            "patient_id": data.patient_id,
            "payment_id": data.payment_id,
            "start_time": data.window.start().to_rfc3339(),
            "end_time": data.window.end().to_rfc3339(),
            "fee": data.fee,
            "status": ConsultationStatus::Pending.to_string(),
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
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
                "/rest/v1/consultations",
                Some(auth_token),
                Some(consultation_data),
                Some(headers),
            )
            .await
            .map_err(|e| ConsultationError::Database(e.to_string()))?;

        if result.is_empty() {
            return Err(ConsultationError::Database(
                "Failed to create consultation".to_string(),
            ));
        }

        let consultation: Consultation = serde_json::from_value(result[0].clone())
            .map_err(|e| ConsultationError::Database(format!("Failed to parse consultation: {}", e)))?;

        debug!("Consultation {} created", consultation.id);
        Ok(consultation.id)
    }

    pub async fn get(
        &self,
        consultation_id: Uuid,
        auth_token: &str,
    ) -> Result<Consultation, ConsultationError> {
        let path = format!("/rest/v1/consultations?id=eq.{}", consultation_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ConsultationError::Database(e.to_string()))?;

        if result.is_empty() {
            return Err(ConsultationError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| ConsultationError::Database(format!("Failed to parse consultation: {}", e)))
    }

    /// Only pending consultations block a slot, so conflict scans fetch
    /// exactly those. The filter runs on the indexed doctor_id + status pair.
    pub async fn pending_by_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Consultation>, ConsultationError> {
        let path = format!(
            "/rest/v1/consultations?doctor_id=eq.{}&status=eq.pending&order=start_time.asc",
            doctor_id
        );
        self.fetch_list(&path, auth_token).await
    }

    pub async fn pending_by_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Consultation>, ConsultationError> {
        let path = format!(
            "/rest/v1/consultations?patient_id=eq.{}&status=eq.pending&order=start_time.asc",
            patient_id
        );
        self.fetch_list(&path, auth_token).await
    }

    pub async fn list_by_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Consultation>, ConsultationError> {
        let path = format!(
            "/rest/v1/consultations?doctor_id=eq.{}&order=start_time.desc",
            doctor_id
        );
        self.fetch_list(&path, auth_token).await
    }

    pub async fn list_by_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Consultation>, ConsultationError> {
        let path = format!(
            "/rest/v1/consultations?patient_id=eq.{}&order=start_time.desc",
            patient_id
        );
        self.fetch_list(&path, auth_token).await
    }

    /// The only mutation of a consultation's window. Callers re-validate via
    /// the reschedule orchestrator before reaching this.
    pub async fn update_window(
        &self,
        consultation_id: Uuid,
        window: SlotWindow,
        auth_token: &str,
    ) -> Result<(), ConsultationError> {
        let update_data = json!({
            "start_time": window.start().to_rfc3339(),
            "end_time": window.end().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        self.patch(consultation_id, update_data, auth_token).await
    }

    pub async fn update_status(
        &self,
        consultation_id: Uuid,
        status: ConsultationStatus,
        auth_token: &str,
    ) -> Result<(), ConsultationError> {
        let update_data = json!({
            "status": status.to_string(),
            "updated_at": Utc::now().to_rfc3339()
        });

        self.patch(consultation_id, update_data, auth_token).await
    }

    pub async fn attach_room(
        &self,
        consultation_id: Uuid,
        room_id: &str,
        auth_token: &str,
    ) -> Result<(), ConsultationError> {
        let update_data = json!({
            "room_id": room_id,
            "updated_at": Utc::now().to_rfc3339()
        });

        self.patch(consultation_id, update_data, auth_token).await
    }

    pub async fn clear_room(
        &self,
        consultation_id: Uuid,
        auth_token: &str,
    ) -> Result<(), ConsultationError> {
        let update_data = json!({
            "room_id": null,
            "updated_at": Utc::now().to_rfc3339()
        });

        self.patch(consultation_id, update_data, auth_token).await
    }

    async fn fetch_list(
        &self,
        path: &str,
        auth_token: &str,
    ) -> Result<Vec<Consultation>, ConsultationError> {
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await
            .map_err(|e| ConsultationError::Database(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Consultation>, _>>()
            .map_err(|e| ConsultationError::Database(format!("Failed to parse consultations: {}", e)))
    }

    async fn patch(
        &self,
        consultation_id: Uuid,
        update_data: Value,
        auth_token: &str,
    ) -> Result<(), ConsultationError> {
        let path = format!("/rest/v1/consultations?id=eq.{}", consultation_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let _: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(update_data),
                Some(headers),
            )
            .await
            .map_err(|e| ConsultationError::Database(e.to_string()))?;

        Ok(())
    }
}
