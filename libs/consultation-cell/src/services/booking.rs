use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use doctor_cell::models::DoctorError;
use doctor_cell::services::doctor::DoctorService;
use payment_cell::models::{ChargeOutcome, PaymentError};
use payment_cell::services::records::PaymentRecordService;
use payment_cell::services::square::SquarePaymentsClient;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_schedule::SlotWindow;

use crate::models::ConsultationError;
use crate::services::availability::AvailabilityService;
use crate::services::locks::DoctorSlotLocks;
use crate::services::store::{ConsultationStore, NewConsultation};

const RESCHEDULE_CUTOFF_MINUTES: i64 = 60;

fn map_payment_error(e: PaymentError) -> ConsultationError {
    match e {
        // A declined charge and an unconfirmed one end the attempt the same
        // way: nothing persisted, caller may retry with a new attempt.
        PaymentError::Declined | PaymentError::Unconfirmed(_) => ConsultationError::PaymentFailed,
        PaymentError::NotConfigured => {
            ConsultationError::Provider("Payment provider is not configured".to_string())
        }
        PaymentError::Provider(msg) => ConsultationError::Provider(msg),
        PaymentError::Database(msg) => ConsultationError::Database(msg),
    }
}

/// Orchestrates the payment-and-booking sequence and rescheduling. The write
/// path holds a per-doctor lock from the availability check through the
/// consultation insert.
pub struct BookingService {
    config: AppConfig,
    supabase: Arc<SupabaseClient>,
    store: ConsultationStore,
    availability: AvailabilityService,
    doctor_service: DoctorService,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));

        Self {
            config: config.clone(),
            store: ConsultationStore::new(Arc::clone(&supabase)),
            availability: AvailabilityService::new(config),
            doctor_service: DoctorService::new(config),
            supabase,
        }
    }

    /// Book a consultation slot: availability first, then payment, then
    /// persistence. Each failure short-circuits and leaves no partial state;
    /// the one exception (charge captured, persistence failed) is compensated
    /// with a refund.
    pub async fn book_slot(
        &self,
        patient_id: Uuid,
        doctor_id: Uuid,
        window: SlotWindow,
        source_id: &str,
        auth_token: &str,
    ) -> Result<Uuid, ConsultationError> {
        info!(
            "Booking request for doctor {} slot {} to {}",
            doctor_id,
            window.start(),
            window.end()
        );

        let doctor = self
            .doctor_service
            .get_doctor(doctor_id, auth_token)
            .await
            .map_err(|e| match e {
                DoctorError::NotFound => ConsultationError::DoctorNotFound,
                other => ConsultationError::Database(other.to_string()),
            })?;

        // Critical section keyed by doctor id: no other booking for this
        // doctor may run its check-then-insert while we do ours.
        let _guard = DoctorSlotLocks::global().acquire(doctor_id).await;

        let doctor_free = self
            .availability
            .is_doctor_free_with(&doctor, &window, None, auth_token)
            .await?;
        let patient_free = self
            .availability
            .is_patient_free(patient_id, &window, None, auth_token)
            .await?;

        if !doctor_free || !patient_free {
            info!("Slot unavailable for doctor {} - booking rejected before payment", doctor_id);
            return Err(ConsultationError::SlotUnavailable);
        }
        debug!("Availability checks passed for doctor {}", doctor_id);

        let fee = doctor.fee;
        if fee <= 0 {
            return Err(ConsultationError::MissingFee);
        }

        // The single side-effecting external call. Not retried here; a new
        // attempt gets a new idempotency key.
        let payments = SquarePaymentsClient::new(&self.config).map_err(map_payment_error)?;
        let charge = payments
            .charge(source_id, fee)
            .await
            .map_err(map_payment_error)?;
        info!("Payment of {} captured as {}", fee, charge.provider_payment_id);

        let records = PaymentRecordService::new(&self.supabase);
        let payment_id = match records
            .record_payment(&charge.provider_payment_id, fee, auth_token)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                self.compensate_charge(&payments, &charge).await;
                return Err(map_payment_error(e));
            }
        };
        debug!("Payment recorded as {}", payment_id);

        let consultation_id = match self
            .store
            .create(
                NewConsultation {
                    doctor_id,
                    patient_id,
                    payment_id,
                    window,
                    fee,
                },
                auth_token,
            )
            .await
        {
            Ok(id) => id,
            Err(e) => {
                self.compensate_charge(&payments, &charge).await;
                return Err(e);
            }
        };

        info!("Consultation {} booked for doctor {}", consultation_id, doctor_id);
        Ok(consultation_id)
    }

    /// Check whether a slot could be booked right now. Read-only; the booking
    /// path re-checks under its lock.
    pub async fn check_slot(
        &self,
        patient_id: Uuid,
        doctor_id: Uuid,
        window: SlotWindow,
        auth_token: &str,
    ) -> Result<bool, ConsultationError> {
        let doctor = self
            .doctor_service
            .get_doctor(doctor_id, auth_token)
            .await
            .map_err(|e| match e {
                DoctorError::NotFound => ConsultationError::DoctorNotFound,
                other => ConsultationError::Database(other.to_string()),
            })?;

        if !doctor.available {
            return Ok(false);
        }

        let doctor_free = self
            .availability
            .is_doctor_free_with(&doctor, &window, None, auth_token)
            .await?;
        let patient_free = self
            .availability
            .is_patient_free(patient_id, &window, None, auth_token)
            .await?;

        Ok(doctor_free && patient_free)
    }

    /// Move an existing consultation to a new window. No payment step - the
    /// original charge stands.
    pub async fn reschedule(
        &self,
        caller_patient_id: Uuid,
        consultation_id: Uuid,
        window: SlotWindow,
        auth_token: &str,
    ) -> Result<(), ConsultationError> {
        info!(
            "Reschedule request for consultation {} to {} - {}",
            consultation_id,
            window.start(),
            window.end()
        );

        let consultation = self.store.get(consultation_id, auth_token).await?;

        if consultation.patient_id != caller_patient_id {
            return Err(ConsultationError::Unauthorized);
        }

        let now = Utc::now();
        // Hard business rule: less than one hour to the booked start and the
        // window may no longer be moved, whatever the target slot looks like.
        if consultation.start_time - now < Duration::minutes(RESCHEDULE_CUTOFF_MINUTES) {
            info!("Reschedule rejected for {}: inside the cutoff", consultation_id);
            return Err(ConsultationError::TooLateToReschedule);
        }

        if window.starts_before(now) {
            return Err(ConsultationError::InvalidSlot(
                "Rescheduled slot must not start in the past".to_string(),
            ));
        }

        let _guard = DoctorSlotLocks::global()
            .acquire(consultation.doctor_id)
            .await;

        // The patient identity comes from the stored row, not caller input;
        // the row itself is excluded from its own conflict scan.
        let doctor_free = self
            .availability
            .is_doctor_free(
                consultation.doctor_id,
                &window,
                Some(consultation.id),
                auth_token,
            )
            .await?;
        let patient_free = self
            .availability
            .is_patient_free(
                consultation.patient_id,
                &window,
                Some(consultation.id),
                auth_token,
            )
            .await?;

        if !doctor_free || !patient_free {
            return Err(ConsultationError::SlotUnavailable);
        }

        self.store
            .update_window(consultation.id, window, auth_token)
            .await?;

        info!("Consultation {} rescheduled", consultation_id);
        Ok(())
    }

    /// Compensation for the payment-then-persist gap: the charge was captured
    /// but no consultation references it, so give the money back. A failed
    /// refund is logged with the charge id for reconciliation.
    async fn compensate_charge(&self, payments: &SquarePaymentsClient, charge: &ChargeOutcome) {
        warn!(
            "Persistence failed after charge {} was captured, issuing refund",
            charge.provider_payment_id
        );

        match payments
            .refund(&charge.provider_payment_id, charge.amount)
            .await
        {
            Ok(refund_id) => {
                info!("Refund {} issued for charge {}", refund_id, charge.provider_payment_id);
            }
            Err(e) => {
                error!(
                    "Refund of charge {} failed ({}); manual reconciliation required",
                    charge.provider_payment_id, e
                );
            }
        }
    }
}
