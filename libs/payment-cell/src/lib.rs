pub mod models;
pub mod services;

pub use models::{ChargeOutcome, PaymentError, PaymentRecord};
pub use services::records::PaymentRecordService;
pub use services::square::SquarePaymentsClient;
