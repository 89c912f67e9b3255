use chrono::{DateTime, Datelike, FixedOffset, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The clinic operates on a single canonical time zone: IST (UTC+05:30).
/// The zone observes no daylight saving, so a fixed offset is exact.
/// Conversions must go through this offset, never the host-local zone.
const CLINIC_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

pub fn clinic_offset() -> FixedOffset {
    FixedOffset::east_opt(CLINIC_OFFSET_SECS).expect("valid clinic offset")
}

/// Civil weekday in the clinic zone. This is the only weekday table in the
/// system; shift rows serialize it as the short day name ("Sun".."Sat").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClinicDay {
    Sun,
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
}

impl ClinicDay {
    pub const WEEKDAYS: [ClinicDay; 5] = [
        ClinicDay::Mon,
        ClinicDay::Tue,
        ClinicDay::Wed,
        ClinicDay::Thu,
        ClinicDay::Fri,
    ];
}

impl From<Weekday> for ClinicDay {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Sun => ClinicDay::Sun,
            Weekday::Mon => ClinicDay::Mon,
            Weekday::Tue => ClinicDay::Tue,
            Weekday::Wed => ClinicDay::Wed,
            Weekday::Thu => ClinicDay::Thu,
            Weekday::Fri => ClinicDay::Fri,
            Weekday::Sat => ClinicDay::Sat,
        }
    }
}

impl fmt::Display for ClinicDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClinicDay::Sun => "Sun",
            ClinicDay::Mon => "Mon",
            ClinicDay::Tue => "Tue",
            ClinicDay::Wed => "Wed",
            ClinicDay::Thu => "Thu",
            ClinicDay::Fri => "Fri",
            ClinicDay::Sat => "Sat",
        };
        write!(f, "{}", name)
    }
}

/// An instant broken down into clinic-zone civil coordinates: the weekday
/// and minutes since local midnight, the units shifts are declared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClinicClock {
    pub weekday: ClinicDay,
    pub minutes_since_midnight: u16,
}

pub fn clinic_clock(instant: DateTime<Utc>) -> ClinicClock {
    let local = instant.with_timezone(&clinic_offset());

    ClinicClock {
        weekday: ClinicDay::from(local.weekday()),
        minutes_since_midnight: (local.hour() * 60 + local.minute()) as u16,
    }
}

/// Clinic-zone civil date of an instant, for same-day slot validation.
pub fn clinic_date(instant: DateTime<Utc>) -> chrono::NaiveDate {
    instant.with_timezone(&clinic_offset()).date_naive()
}
