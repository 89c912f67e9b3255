use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{CreatePatientRequest, Patient, PatientError, UpdatePatientRequest};

pub struct PatientService {
    supabase: SupabaseClient,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// The profile row shares its id with the authenticated user so that
    /// ownership checks can compare ids directly.
    pub async fn create_patient(
        &self,
        user_id: Uuid,
        request: CreatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        debug!("Creating patient profile for {}", request.email);

        let existing_path = format!(
            "/rest/v1/patients?phone=eq.{}",
            urlencoding::encode(&request.phone)
        );
        let existing: Vec<Value> = self
            .supabase
            .request(Method::GET, &existing_path, Some(auth_token), None)
            .await
            .map_err(|e| PatientError::Database(e.to_string()))?;

        if !existing.is_empty() {
            return Err(PatientError::AlreadyExists);
        }

        let patient_data = json!({
            "id": user_id,
            "name": request.name,
            "email": request.email,
            "phone": request.phone,
            "gender": request.gender,
            "dob": request.dob.format("%Y-%m-%d").to_string(),
            "profile_url": request.profile_url,
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
                "/rest/v1/patients",
                Some(auth_token),
                Some(patient_data),
                Some(headers),
            )
            .await
            .map_err(|e| PatientError::Database(e.to_string()))?;

        if result.is_empty() {
            return Err(PatientError::Database("Failed to create patient".to_string()));
        }

        let patient: Patient = serde_json::from_value(result[0].clone())
            .map_err(|e| PatientError::Database(format!("Failed to parse patient: {}", e)))?;

        debug!("Patient profile created with id {}", patient.id);
        Ok(patient)
    }

    pub async fn get_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        debug!("Fetching patient {}", patient_id);

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| PatientError::Database(e.to_string()))?;

        if result.is_empty() {
            return Err(PatientError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| PatientError::Database(format!("Failed to parse patient: {}", e)))
    }

    /// Existence check used by the availability flow before the patient-side
    /// conflict scan.
    pub async fn patient_exists(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<bool, PatientError> {
        match self.get_patient(patient_id, auth_token).await {
            Ok(_) => Ok(true),
            Err(PatientError::NotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn update_patient(
        &self,
        patient_id: Uuid,
        request: UpdatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        debug!("Updating patient {}", patient_id);

        let mut update_data = serde_json::Map::new();
        if let Some(name) = request.name {
            update_data.insert("name".to_string(), json!(name));
        }
        if let Some(email) = request.email {
            update_data.insert("email".to_string(), json!(email));
        }
        if let Some(gender) = request.gender {
            update_data.insert("gender".to_string(), json!(gender));
        }
        if let Some(dob) = request.dob {
            update_data.insert("dob".to_string(), json!(dob.format("%Y-%m-%d").to_string()));
        }
        if let Some(profile_url) = request.profile_url {
            update_data.insert("profile_url".to_string(), json!(profile_url));
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(Value::Object(update_data)),
                Some(headers),
            )
            .await
            .map_err(|e| PatientError::Database(e.to_string()))?;

        if result.is_empty() {
            return Err(PatientError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| PatientError::Database(format!("Failed to parse patient: {}", e)))
    }
}
