pub mod address;
pub mod config;
pub mod error;
pub mod models;
pub mod telemetry;

pub use address::{ContractAddress, is_valid_address};
pub use config::Settings;
pub use error::AppError;
