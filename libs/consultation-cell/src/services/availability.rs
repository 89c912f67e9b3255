use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use doctor_cell::models::{Doctor, DoctorError};
use doctor_cell::services::doctor::DoctorService;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_schedule::SlotWindow;

use crate::models::{Consultation, ConsultationError};
use crate::services::store::ConsultationStore;

/// Half-open interval overlap: `[start1, end1)` intersects `[start2, end2)`.
/// Equality at a boundary is not an overlap, so back-to-back slots are safe.
fn windows_overlap(
    start1: DateTime<Utc>,
    end1: DateTime<Utc>,
    start2: DateTime<Utc>,
    end2: DateTime<Utc>,
) -> bool {
    start1 < end2 && start2 < end1
}

fn any_conflict(
    consultations: &[Consultation],
    window: &SlotWindow,
    exclude: Option<Uuid>,
) -> bool {
    consultations.iter().any(|consultation| {
        exclude != Some(consultation.id)
            && windows_overlap(
                consultation.start_time,
                consultation.end_time,
                window.start(),
                window.end(),
            )
    })
}

/// Read-only conflict checks for a candidate window. Booking and reschedule
/// must AND the doctor-side and patient-side results; either failing fails
/// the whole operation.
pub struct AvailabilityService {
    store: ConsultationStore,
    doctor_service: DoctorService,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: ConsultationStore::new(Arc::new(SupabaseClient::new(config))),
            doctor_service: DoctorService::new(config),
        }
    }

    /// Fails closed: an unresolvable doctor is reported as not free.
    pub async fn is_doctor_free(
        &self,
        doctor_id: Uuid,
        window: &SlotWindow,
        exclude: Option<Uuid>,
        auth_token: &str,
    ) -> Result<bool, ConsultationError> {
        let doctor = match self.doctor_service.get_doctor(doctor_id, auth_token).await {
            Ok(doctor) => doctor,
            Err(DoctorError::NotFound) => {
                debug!("Doctor {} not found, treating slot as unavailable", doctor_id);
                return Ok(false);
            }
            Err(e) => return Err(ConsultationError::Database(e.to_string())),
        };

        self.is_doctor_free_with(&doctor, window, exclude, auth_token)
            .await
    }

    /// Variant for callers that already resolved the doctor row.
    pub async fn is_doctor_free_with(
        &self,
        doctor: &Doctor,
        window: &SlotWindow,
        exclude: Option<Uuid>,
        auth_token: &str,
    ) -> Result<bool, ConsultationError> {
        // Shift containment is enforced here and in discovery alike.
        if !doctor.shift_covers(window) {
            debug!("Slot falls outside the shifts of doctor {}", doctor.id);
            return Ok(false);
        }

        let pending = self.store.pending_by_doctor(doctor.id, auth_token).await?;
        if any_conflict(&pending, window, exclude) {
            debug!("Slot conflicts with a pending consultation of doctor {}", doctor.id);
            return Ok(false);
        }

        Ok(true)
    }

    pub async fn is_patient_free(
        &self,
        patient_id: Uuid,
        window: &SlotWindow,
        exclude: Option<Uuid>,
        auth_token: &str,
    ) -> Result<bool, ConsultationError> {
        let pending = self.store.pending_by_patient(patient_id, auth_token).await?;
        if any_conflict(&pending, window, exclude) {
            debug!("Slot conflicts with a pending consultation of patient {}", patient_id);
            return Ok(false);
        }

        Ok(true)
    }
}
