pub mod cli;
pub mod config;
pub mod database;
pub mod models;
pub mod report;
pub mod session;
pub mod summary;
pub mod utils;

#[cfg(test)]
mod test_utils;

pub use config::Config;
pub use database::Database;
pub use models::{Activity, AttendanceRecord, Evidence, FinancialMovement, MovementKind, ServiceType};
pub use session::Session;
pub use utils::Profile;
