use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_schedule::{clinic_clock, ClinicDay, SlotWindow};

/// One recurring weekly working block of a doctor. Times are minutes since
/// midnight in the clinic zone, `[0, 1440)`, `start_time < end_time`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shift {
    pub day_of_week: ClinicDay,
    pub start_time: u16,
    pub end_time: u16,
    pub slot_duration: u16,
}

impl Shift {
    pub fn is_well_formed(&self) -> bool {
        self.start_time < self.end_time && self.end_time < 24 * 60
    }

    /// Whether the candidate window lies entirely inside this shift on the
    /// matching clinic-zone weekday. Shift boundaries are inclusive: a slot
    /// may start exactly at shift start and end exactly at shift end.
    pub fn covers(&self, window: &SlotWindow) -> bool {
        let start = clinic_clock(window.start());
        let end = clinic_clock(window.end());

        start.weekday == self.day_of_week
            && self.start_time <= start.minutes_since_midnight
            && end.minutes_since_midnight <= self.end_time
    }
}

/// The default weekly plan seeded at registration: Mon-Fri, a morning and an
/// evening shift with 30-minute slots.
pub fn default_shift_plan() -> Vec<Shift> {
    let mut shifts = Vec::with_capacity(ClinicDay::WEEKDAYS.len() * 2);
    for day in ClinicDay::WEEKDAYS {
        shifts.push(Shift {
            day_of_week: day,
            start_time: 9 * 60,
            end_time: 13 * 60,
            slot_duration: 30,
        });
        shifts.push(Shift {
            day_of_week: day,
            start_time: 14 * 60,
            end_time: 18 * 60,
            slot_duration: 30,
        });
    }
    shifts
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub gender: String,
    pub dob: NaiveDate,
    /// Consultation fee in the smallest currency unit. Zero means the doctor
    /// has not finished onboarding and cannot be booked.
    pub fee: i64,
    pub specialty: String,
    pub profile_url: Option<String>,
    /// Coarse accepting-new-bookings switch, independent of shifts.
    pub available: bool,
    pub shifts: Vec<Shift>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Doctor {
    /// True when the window sits inside at least one of the doctor's shifts.
    pub fn shift_covers(&self, window: &SlotWindow) -> bool {
        self.shifts.iter().any(|shift| shift.covers(window))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDoctorRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub gender: String,
    pub dob: NaiveDate,
    pub fee: i64,
    pub specialty: String,
    pub profile_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateDoctorRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub gender: Option<String>,
    pub dob: Option<NaiveDate>,
    pub fee: Option<i64>,
    pub specialty: Option<String>,
    pub profile_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DoctorFilterQuery {
    pub specialty: Option<String>,
    pub fee_min: Option<i64>,
    pub fee_max: Option<i64>,
    pub name: Option<String>,
    pub available: Option<bool>,
}

/// Read-model row returned by listing and discovery. Deliberately excludes
/// the shift plan and contact details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorSummary {
    pub id: Uuid,
    pub name: String,
    pub specialty: String,
    pub fee: i64,
    pub profile_url: Option<String>,
}

impl From<&Doctor> for DoctorSummary {
    fn from(doctor: &Doctor) -> Self {
        Self {
            id: doctor.id,
            name: doctor.name.clone(),
            specialty: doctor.specialty.clone(),
            fee: doctor.fee,
            profile_url: doctor.profile_url.clone(),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Doctor with this phone already exists")]
    AlreadyExists,

    #[error("Doctor has pending consultations - availability can't be changed")]
    AvailabilityLocked,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use shared_schedule::SlotWindow;

    fn monday_slot(h_ist: u32, m_ist: u32) -> SlotWindow {
        // 2025-01-06 is a Monday. Build the UTC instant whose IST clock reads
        // the given hour/minute.
        let ist_minutes = (h_ist * 60 + m_ist) as i64;
        let utc_minutes = ist_minutes - (5 * 60 + 30);
        let start = Utc
            .with_ymd_and_hms(2025, 1, 6, 0, 0, 0)
            .unwrap()
            + chrono::Duration::minutes(utc_minutes);
        SlotWindow::new(start, start + chrono::Duration::minutes(30)).unwrap()
    }

    fn morning_shift() -> Shift {
        Shift {
            day_of_week: ClinicDay::Mon,
            start_time: 9 * 60,
            end_time: 13 * 60,
            slot_duration: 30,
        }
    }

    #[test]
    fn shift_covers_window_at_exact_boundaries() {
        let shift = morning_shift();

        assert!(shift.covers(&monday_slot(9, 0)));
        assert!(shift.covers(&monday_slot(12, 30)));
    }

    #[test]
    fn shift_rejects_windows_outside_working_block() {
        let shift = morning_shift();

        // ends past shift end
        assert!(!shift.covers(&monday_slot(12, 45)));
        // starts before shift start
        assert!(!shift.covers(&monday_slot(8, 45)));
        // entirely in the afternoon
        assert!(!shift.covers(&monday_slot(14, 0)));
    }

    #[test]
    fn shift_rejects_windows_on_another_weekday() {
        let shift = Shift {
            day_of_week: ClinicDay::Tue,
            ..morning_shift()
        };

        assert!(!shift.covers(&monday_slot(9, 0)));
    }

    #[test]
    fn default_plan_has_two_shifts_per_weekday() {
        let plan = default_shift_plan();
        assert_eq!(plan.len(), 10);
        assert!(plan.iter().all(|s| s.is_well_formed()));
    }
}
