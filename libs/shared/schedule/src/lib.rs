pub mod clock;
pub mod slot;

pub use clock::{clinic_clock, clinic_offset, ClinicClock, ClinicDay};
pub use slot::{SlotError, SlotWindow, SLOT_DURATION_MINUTES};
