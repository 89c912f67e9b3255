use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_schedule::SlotWindow;

use crate::models::{Doctor, DoctorError, DoctorSummary};

#[derive(Debug, Deserialize)]
struct BusyDoctorRow {
    doctor_id: Uuid,
}

/// Instant-match query: which doctors of a specialty are free for a specific
/// slot right now. Read-only snapshot with no transactional guarantee - a
/// listed doctor can be booked away by a concurrent request, and the booking
/// orchestrator's own availability check remains the source of truth.
pub struct DoctorDiscoveryService {
    supabase: SupabaseClient,
}

impl DoctorDiscoveryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Two set-based queries plus an in-memory anti-join, never a per-doctor
    /// loop of store calls:
    /// 1. doctors matching specialty + available flag, shift-filtered here;
    /// 2. all pending consultations of the shortlist overlapping the window.
    pub async fn find_available_doctors(
        &self,
        specialty: &str,
        window: SlotWindow,
        auth_token: &str,
    ) -> Result<Vec<DoctorSummary>, DoctorError> {
        debug!(
            "Finding {} doctors free between {} and {}",
            specialty,
            window.start(),
            window.end()
        );

        let doctors_path = format!(
            "/rest/v1/doctors?specialty=eq.{}&available=eq.true",
            urlencoding::encode(specialty)
        );
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &doctors_path, Some(auth_token), None)
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))?;

        let candidates: Vec<Doctor> = rows
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Doctor>, _>>()
            .map_err(|e| DoctorError::Database(format!("Failed to parse doctors: {}", e)))?;

        let on_shift: Vec<&Doctor> = candidates
            .iter()
            .filter(|doctor| doctor.shift_covers(&window))
            .collect();

        if on_shift.is_empty() {
            return Ok(vec![]);
        }

        let id_list = on_shift
            .iter()
            .map(|doctor| doctor.id.to_string())
            .collect::<Vec<_>>()
            .join(",");

        // Half-open overlap: existing.start < window.end AND existing.end > window.start
        let busy_path = format!(
            "/rest/v1/consultations?doctor_id=in.({})&status=eq.pending&start_time=lt.{}&end_time=gt.{}&select=doctor_id",
            id_list,
            urlencoding::encode(&window.end().to_rfc3339()),
            urlencoding::encode(&window.start().to_rfc3339()),
        );

        let busy_rows: Vec<BusyDoctorRow> = self
            .supabase
            .request(Method::GET, &busy_path, Some(auth_token), None)
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))?;

        let busy_ids: std::collections::HashSet<Uuid> =
            busy_rows.into_iter().map(|row| row.doctor_id).collect();

        let free: Vec<DoctorSummary> = on_shift
            .into_iter()
            .filter(|doctor| !busy_ids.contains(&doctor.id))
            .map(DoctorSummary::from)
            .collect();

        info!(
            "Instant-match found {} free {} doctors for the window",
            free.len(),
            specialty
        );
        Ok(free)
    }
}
