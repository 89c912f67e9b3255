use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::clinic_date;

/// Consultation slots have a fixed length. Fee and shift logic assume it, so
/// the constraint is enforced here at the validation boundary rather than in
/// the availability checker.
pub const SLOT_DURATION_MINUTES: i64 = 30;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SlotError {
    #[error("slot start must be before slot end")]
    Inverted,

    #[error("slot must start and end on the same clinic-zone day")]
    CrossesDayBoundary,

    #[error("slot duration must be exactly {SLOT_DURATION_MINUTES} minutes")]
    WrongDuration,
}

/// A validated candidate slot: a half-open interval `[start, end)` that is
/// ordered, exactly one slot long, and contained in a single clinic-zone
/// civil day. Construction is the only way to obtain one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "(DateTime<Utc>, DateTime<Utc>)")]
#[serde(into = "(DateTime<Utc>, DateTime<Utc>)")]
pub struct SlotWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl SlotWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, SlotError> {
        if start >= end {
            return Err(SlotError::Inverted);
        }
        if clinic_date(start) != clinic_date(end) {
            return Err(SlotError::CrossesDayBoundary);
        }
        if (end - start).num_minutes() != SLOT_DURATION_MINUTES {
            return Err(SlotError::WrongDuration);
        }

        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn starts_before(&self, instant: DateTime<Utc>) -> bool {
        self.start < instant
    }
}

impl TryFrom<(DateTime<Utc>, DateTime<Utc>)> for SlotWindow {
    type Error = SlotError;

    fn try_from((start, end): (DateTime<Utc>, DateTime<Utc>)) -> Result<Self, Self::Error> {
        SlotWindow::new(start, end)
    }
}

impl From<SlotWindow> for (DateTime<Utc>, DateTime<Utc>) {
    fn from(window: SlotWindow) -> Self {
        (window.start, window.end)
    }
}
