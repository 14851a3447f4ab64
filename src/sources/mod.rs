//! In-process sensor sources feeding the ingestion path.
//!
//! - `mock`: simulated Arduino, enabled with `MOCK_SENSORS`
//! - `serial`: JSON lines from a real Arduino on `SERIAL_PORT`

use std::time::Duration;

use sqlx::SqlitePool;
use tokio::task::JoinHandle;
use tracing::info;

use crate::notify::Notifier;
use crate::plant_health::PlantHealthConfig;
use crate::Config;

pub mod mock;
pub mod serial;

// ---

/// Start every source enabled in `cfg`.
pub fn spawn(pool: &SqlitePool, cfg: &Config, notifier: &Notifier) -> Vec<JoinHandle<()>> {
    // ---
    let mut handles = Vec::new();

    if cfg.mock_sensors {
        handles.push(tokio::spawn(mock::run(
            pool.clone(),
            PlantHealthConfig::default(),
            cfg.alert_active_cap,
            Duration::from_secs(u64::from(cfg.mock_interval_secs)),
            notifier.clone(),
        )));
    }

    if let Some(port) = &cfg.serial_port {
        handles.push(tokio::spawn(serial::run(
            pool.clone(),
            PlantHealthConfig::default(),
            cfg.alert_active_cap,
            port.clone(),
            cfg.serial_baud,
            notifier.clone(),
        )));
    }

    if handles.is_empty() {
        info!("No sensor sources enabled; waiting for POST /api/sensor-data");
    }
    handles
}
