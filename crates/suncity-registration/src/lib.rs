pub mod config;
pub mod error;
pub mod registration;
pub mod telemetry;
