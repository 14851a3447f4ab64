//! Sensor ingestion: payload parsing and the single write path shared by the
//! HTTP route and the in-process sources.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, warn};

use crate::alerts;
use crate::models::NewReading;
use crate::plant_health::PlantHealthConfig;
use crate::readings;

// ---

/// Payload key carrying the plant id rather than a reading.
const PLANT_ID_KEY: &str = "plantId";

/// Payload key wrapping readings in the nested form.
const SENSOR_DATA_KEY: &str = "sensorData";

/// Rejected ingestion payload.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("Sensor payload must be a JSON object")]
    NotAnObject,
}

/// Numeric readings extracted from one payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorBatch {
    pub readings: Vec<NewReading>,
    pub plant_id: Option<i64>,
}

impl SensorBatch {
    /// Parse either `{"temperature": 21.5, ...}` or
    /// `{"sensorData": {...}, "plantId": 3}`.
    ///
    /// Non-numeric fields are skipped with a warning.
    pub fn from_json(payload: &Value) -> Result<Self, PayloadError> {
        // ---
        let body = payload.as_object().ok_or(PayloadError::NotAnObject)?;

        let data: &Map<String, Value> = match body.get(SENSOR_DATA_KEY) {
            Some(Value::Object(inner)) => inner,
            Some(_) => return Err(PayloadError::NotAnObject),
            None => body,
        };
        let plant_id = body.get(PLANT_ID_KEY).and_then(parse_plant_id);

        let mut readings = Vec::with_capacity(data.len());
        for (key, value) in data {
            if key == PLANT_ID_KEY {
                continue;
            }
            match value.as_f64() {
                Some(v) if v.is_finite() => readings.push(NewReading::new(key.as_str(), v)),
                _ => warn!("Skipping non-numeric sensor data for {}: {}", key, value),
            }
        }

        Ok(Self { readings, plant_id })
    }
}

fn parse_plant_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Outcome of one ingestion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub stored: u64,
    pub alerts_created: Vec<i64>,
    pub auto_dismissed: u64,
}

/// Persist a batch, raise alerts for dangerous values and enforce the active
/// alert cap, all in one transaction.
///
/// The reading inserts come first so the transaction takes SQLite's write
/// lock before it reads the active alert set.
pub async fn ingest(
    pool: &SqlitePool,
    batch: &SensorBatch,
    health: &PlantHealthConfig,
    alert_cap: u32,
    now: DateTime<Utc>,
) -> Result<IngestReport, sqlx::Error> {
    // ---
    if batch.readings.is_empty() {
        debug!("Empty sensor batch, nothing to store");
        return Ok(IngestReport::default());
    }

    let mut tx = pool.begin().await?;

    let stored = readings::insert_batch(&mut *tx, &batch.readings, batch.plant_id, now).await?;
    let alerts_created =
        alerts::create_for_readings(&mut *tx, &batch.readings, batch.plant_id, health, now).await?;
    let auto_dismissed = alerts::enforce_active_cap(&mut *tx, alert_cap, now).await?;

    tx.commit().await?;

    debug!(
        stored,
        alerts = alerts_created.len(),
        auto_dismissed,
        "Ingested sensor batch"
    );

    Ok(IngestReport {
        stored,
        alerts_created,
        auto_dismissed,
    })
}
