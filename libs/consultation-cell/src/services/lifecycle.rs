use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    Consultation, ConsultationError, ConsultationStatus, DoctorConsultationView, JoinInfo,
    PatientConsultationView,
};
use crate::services::rooms::VideoRoomClient;
use crate::services::store::ConsultationStore;

/// Participants may enter the room this long before the booked start.
const JOIN_WINDOW_MINUTES: i64 = 10;

#[derive(Debug, Deserialize)]
struct PatientNameRow {
    id: Uuid,
    name: String,
    profile_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DoctorNameRow {
    id: Uuid,
    name: String,
    specialty: String,
    profile_url: Option<String>,
}

/// Post-booking lifecycle: role-typed listings, room provisioning on join,
/// and completion (which releases the room).
pub struct LifecycleService {
    config: AppConfig,
    supabase: Arc<SupabaseClient>,
    store: ConsultationStore,
}

impl LifecycleService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));

        Self {
            config: config.clone(),
            store: ConsultationStore::new(Arc::clone(&supabase)),
            supabase,
        }
    }

    /// Fetch a consultation, visible only to its two participants.
    pub async fn get_for_participant(
        &self,
        caller_id: Uuid,
        consultation_id: Uuid,
        auth_token: &str,
    ) -> Result<Consultation, ConsultationError> {
        let consultation = self.store.get(consultation_id, auth_token).await?;

        if consultation.doctor_id != caller_id && consultation.patient_id != caller_id {
            return Err(ConsultationError::Unauthorized);
        }

        Ok(consultation)
    }

    /// Mark a consultation completed. Doctor-only, owner-only. Any live room
    /// is torn down first so completed consultations never hold a room.
    pub async fn complete_consultation(
        &self,
        caller_doctor_id: Uuid,
        consultation_id: Uuid,
        auth_token: &str,
    ) -> Result<(), ConsultationError> {
        debug!("Completing consultation {}", consultation_id);

        let consultation = self.store.get(consultation_id, auth_token).await?;

        if consultation.doctor_id != caller_doctor_id {
            return Err(ConsultationError::Unauthorized);
        }

        if let Some(room_id) = &consultation.room_id {
            let rooms = VideoRoomClient::new(&self.config)?;
            rooms.delete_room(room_id).await?;
            self.store.clear_room(consultation.id, auth_token).await?;
        }

        self.store
            .update_status(consultation.id, ConsultationStatus::Completed, auth_token)
            .await?;

        info!("Consultation {} completed", consultation_id);
        Ok(())
    }

    /// Join the video session. The room is provisioned on first join - after
    /// commit, outside any booking transaction - and reused afterwards.
    pub async fn join_consultation(
        &self,
        caller_id: Uuid,
        consultation_id: Uuid,
        auth_token: &str,
    ) -> Result<JoinInfo, ConsultationError> {
        let consultation = self
            .get_for_participant(caller_id, consultation_id, auth_token)
            .await?;

        let minutes_to_start = (consultation.start_time - Utc::now()).num_minutes();
        if minutes_to_start > JOIN_WINDOW_MINUTES {
            return Err(ConsultationError::JoinWindowNotOpen);
        }

        let rooms = VideoRoomClient::new(&self.config)?;
        let token = rooms.session_token()?;

        if let Some(room_id) = consultation.room_id {
            return Ok(JoinInfo { room_id, token });
        }

        debug!("Provisioning room for consultation {}", consultation_id);
        let room_id = rooms.create_room().await?;

        self.store
            .attach_room(consultation.id, &room_id, auth_token)
            .await?;

        info!("Room {} attached to consultation {}", room_id, consultation_id);
        Ok(JoinInfo { room_id, token })
    }

    /// A doctor's consultation list with the patient-facing fields resolved.
    /// One listing query plus one batched directory lookup, not a per-row
    /// fetch loop.
    pub async fn list_for_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<DoctorConsultationView>, ConsultationError> {
        let consultations = self.store.list_by_doctor(doctor_id, auth_token).await?;
        if consultations.is_empty() {
            return Ok(vec![]);
        }

        let patient_ids: Vec<Uuid> = consultations.iter().map(|c| c.patient_id).collect();
        let patients = self.fetch_patient_names(&patient_ids, auth_token).await?;

        let views = consultations
            .into_iter()
            .filter_map(|consultation| {
                let patient = match patients.get(&consultation.patient_id) {
                    Some(patient) => patient,
                    None => {
                        warn!(
                            "Patient {} of consultation {} missing from directory",
                            consultation.patient_id, consultation.id
                        );
                        return None;
                    }
                };

                Some(DoctorConsultationView {
                    consultation_id: consultation.id,
                    patient_name: patient.name.clone(),
                    patient_profile_url: patient.profile_url.clone(),
                    start_time: consultation.start_time,
                    end_time: consultation.end_time,
                    status: consultation.status,
                })
            })
            .collect();

        Ok(views)
    }

    pub async fn list_for_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<PatientConsultationView>, ConsultationError> {
        let consultations = self.store.list_by_patient(patient_id, auth_token).await?;
        if consultations.is_empty() {
            return Ok(vec![]);
        }

        let doctor_ids: Vec<Uuid> = consultations.iter().map(|c| c.doctor_id).collect();
        let doctors = self.fetch_doctor_names(&doctor_ids, auth_token).await?;

        let views = consultations
            .into_iter()
            .filter_map(|consultation| {
                let doctor = match doctors.get(&consultation.doctor_id) {
                    Some(doctor) => doctor,
                    None => {
                        warn!(
                            "Doctor {} of consultation {} missing from directory",
                            consultation.doctor_id, consultation.id
                        );
                        return None;
                    }
                };

                Some(PatientConsultationView {
                    consultation_id: consultation.id,
                    doctor_name: doctor.name.clone(),
                    doctor_specialty: doctor.specialty.clone(),
                    doctor_profile_url: doctor.profile_url.clone(),
                    start_time: consultation.start_time,
                    end_time: consultation.end_time,
                    status: consultation.status,
                })
            })
            .collect();

        Ok(views)
    }

    async fn fetch_patient_names(
        &self,
        ids: &[Uuid],
        auth_token: &str,
    ) -> Result<HashMap<Uuid, PatientNameRow>, ConsultationError> {
        let id_list = ids
            .iter()
            .map(Uuid::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let path = format!(
            "/rest/v1/patients?id=in.({})&select=id,name,profile_url",
            id_list
        );

        let rows: Vec<PatientNameRow> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ConsultationError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(|row| (row.id, row)).collect())
    }

    async fn fetch_doctor_names(
        &self,
        ids: &[Uuid],
        auth_token: &str,
    ) -> Result<HashMap<Uuid, DoctorNameRow>, ConsultationError> {
        let id_list = ids
            .iter()
            .map(Uuid::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let path = format!(
            "/rest/v1/doctors?id=in.({})&select=id,name,specialty,profile_url",
            id_list
        );

        let rows: Vec<DoctorNameRow> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ConsultationError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(|row| (row.id, row)).collect())
    }
}
