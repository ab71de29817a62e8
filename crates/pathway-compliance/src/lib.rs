pub mod config;
pub mod error;
pub mod pathways;
pub mod telemetry;
