//! Plant monitoring backend: sensor ingestion, threshold health
//! classification, alert lifecycle and plant bookkeeping over SQLite.

pub mod alerts;
pub mod config;
pub mod error;
pub mod ingest;
pub mod models;
pub mod notify;
pub mod plant_health;
pub mod plants;
pub mod readings;
pub mod routes;
pub mod schema;
pub mod sources;

pub use config::Config;
pub use models::{Alert, NewReading, Plant, PlantStage, SensorReading, SensorType};
pub use notify::Notifier;
