use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    default_shift_plan, CreateDoctorRequest, Doctor, DoctorError, DoctorFilterQuery,
    UpdateDoctorRequest,
};

pub struct DoctorService {
    supabase: SupabaseClient,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Register a doctor profile. Every doctor starts with the default weekly
    /// shift plan; shifts are static configuration after this point.
    pub async fn register_doctor(
        &self,
        user_id: Uuid,
        request: CreateDoctorRequest,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        debug!("Registering doctor profile for {}", request.email);

        if request.fee <= 0 {
            return Err(DoctorError::Validation(
                "Consultation fee must be positive".to_string(),
            ));
        }

        let existing_path = format!(
            "/rest/v1/doctors?phone=eq.{}",
            urlencoding::encode(&request.phone)
        );
        let existing: Vec<Value> = self
            .supabase
            .request(Method::GET, &existing_path, Some(auth_token), None)
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))?;

        if !existing.is_empty() {
            return Err(DoctorError::AlreadyExists);
        }

        let doctor_data = json!({
            "id": user_id,
            "name": request.name,
            "email": request.email,
            "phone": request.phone,
            "gender": request.gender,
            "dob": request.dob.format("%Y-%m-%d").to_string(),
            "fee": request.fee,
            "specialty": request.specialty,
            "profile_url": request.profile_url,
            "available": false,
            "shifts": default_shift_plan(),
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
                "/rest/v1/doctors",
                Some(auth_token),
                Some(doctor_data),
                Some(headers),
            )
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))?;

        if result.is_empty() {
            return Err(DoctorError::Database("Failed to register doctor".to_string()));
        }

        let doctor: Doctor = serde_json::from_value(result[0].clone())
            .map_err(|e| DoctorError::Database(format!("Failed to parse doctor: {}", e)))?;

        info!("Doctor {} registered with default shift plan", doctor.id);
        Ok(doctor)
    }

    pub async fn get_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        debug!("Fetching doctor {}", doctor_id);

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))?;

        if result.is_empty() {
            return Err(DoctorError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| DoctorError::Database(format!("Failed to parse doctor: {}", e)))
    }

    pub async fn get_doctor_fee(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<i64, DoctorError> {
        let doctor = self.get_doctor(doctor_id, auth_token).await?;
        Ok(doctor.fee)
    }

    pub async fn list_doctors(
        &self,
        filter: DoctorFilterQuery,
        auth_token: &str,
    ) -> Result<Vec<Doctor>, DoctorError> {
        debug!("Listing doctors with filter {:?}", filter);

        let mut query_parts = Vec::new();
        if let Some(specialty) = &filter.specialty {
            query_parts.push(format!("specialty=eq.{}", urlencoding::encode(specialty)));
        }
        if let Some(fee_min) = filter.fee_min {
            query_parts.push(format!("fee=gte.{}", fee_min));
        }
        if let Some(fee_max) = filter.fee_max {
            query_parts.push(format!("fee=lte.{}", fee_max));
        }
        if let Some(name) = &filter.name {
            // case-insensitive substring match
            query_parts.push(format!("name=ilike.*{}*", urlencoding::encode(name)));
        }
        if let Some(available) = filter.available {
            query_parts.push(format!("available=eq.{}", available));
        }

        let path = if query_parts.is_empty() {
            "/rest/v1/doctors?order=name.asc".to_string()
        } else {
            format!("/rest/v1/doctors?{}&order=name.asc", query_parts.join("&"))
        };

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Doctor>, _>>()
            .map_err(|e| DoctorError::Database(format!("Failed to parse doctors: {}", e)))
    }

    /// Flip the accepting-new-bookings switch. A doctor with any pending
    /// consultation is not allowed to change it.
    pub async fn set_availability(
        &self,
        doctor_id: Uuid,
        available: bool,
        auth_token: &str,
    ) -> Result<(), DoctorError> {
        debug!("Updating availability of doctor {} to {}", doctor_id, available);

        let pending_path = format!(
            "/rest/v1/consultations?doctor_id=eq.{}&status=eq.pending&select=id",
            doctor_id
        );
        let pending: Vec<Value> = self
            .supabase
            .request(Method::GET, &pending_path, Some(auth_token), None)
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))?;

        if !pending.is_empty() {
            return Err(DoctorError::AvailabilityLocked);
        }

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let update_data = json!({
            "available": available,
            "updated_at": Utc::now().to_rfc3339()
        });

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
            .map_err(|e| DoctorError::Database(e.to_string()))?;

        info!("Doctor {} availability set to {}", doctor_id, available);
        Ok(())
    }

    pub async fn update_doctor(
        &self,
        doctor_id: Uuid,
        request: UpdateDoctorRequest,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        debug!("Updating doctor {}", doctor_id);

        if let Some(fee) = request.fee {
            if fee <= 0 {
                return Err(DoctorError::Validation(
                    "Consultation fee must be positive".to_string(),
                ));
            }
        }

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
        if let Some(fee) = request.fee {
            update_data.insert("fee".to_string(), json!(fee));
        }
        if let Some(specialty) = request.specialty {
            update_data.insert("specialty".to_string(), json!(specialty));
        }
        if let Some(profile_url) = request.profile_url {
            update_data.insert("profile_url".to_string(), json!(profile_url));
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
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
            .map_err(|e| DoctorError::Database(e.to_string()))?;

        if result.is_empty() {
            return Err(DoctorError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| DoctorError::Database(format!("Failed to parse doctor: {}", e)))
    }
}
