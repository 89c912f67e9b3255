pub mod auth;
pub mod error;

pub use auth::User;
pub use error::AppError;
