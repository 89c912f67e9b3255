pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{Doctor, DoctorError, DoctorSummary, Shift};
pub use services::discovery::DoctorDiscoveryService;
pub use services::doctor::DoctorService;
