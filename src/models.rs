//! Data models for the plant monitoring API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---

/// Sensors the Arduino reports and the health bands know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorType {
    Temperature,
    Humidity,
    SoilMoisture,
    Illuminance,
    Pressure,
}

impl SensorType {
    pub const ALL: [SensorType; 5] = [
        SensorType::Temperature,
        SensorType::Humidity,
        SensorType::SoilMoisture,
        SensorType::Illuminance,
        SensorType::Pressure,
    ];

    /// Map a payload key to a known sensor.
    pub fn from_key(key: &str) -> Option<Self> {
        // ---
        match key {
            "temperature" => Some(Self::Temperature),
            "humidity" => Some(Self::Humidity),
            "soil_moisture" => Some(Self::SoilMoisture),
            "illuminance" => Some(Self::Illuminance),
            "pressure" => Some(Self::Pressure),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Humidity => "humidity",
            Self::SoilMoisture => "soil_moisture",
            Self::Illuminance => "illuminance",
            Self::Pressure => "pressure",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Self::Temperature => "°C",
            Self::Humidity | Self::SoilMoisture => "%",
            Self::Illuminance => "lux",
            Self::Pressure => "hPa",
        }
    }
}

/// Unit stored alongside a reading; unknown sensors get an empty unit.
pub fn unit_for(sensor_type: &str) -> &'static str {
    SensorType::from_key(sensor_type).map_or("", |s| s.unit())
}

/// A single numeric value parsed from an ingestion payload.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReading {
    // ---
    pub sensor_type: String,
    pub value: f64,
    pub unit: String,
}

impl NewReading {
    pub fn new(sensor_type: impl Into<String>, value: f64) -> Self {
        let sensor_type = sensor_type.into();
        let unit = unit_for(&sensor_type).to_string();
        Self {
            sensor_type,
            value,
            unit,
        }
    }
}

/// Stored sensor reading, as returned by `/api/latest-sensors`.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SensorReading {
    // ---
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub sensor_type: String,
    pub value: f64,
    pub unit: String,
    pub plant_id: Option<i64>,
}

/// One point of a per-sensor chart series.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct HistoryPoint {
    // ---
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub unit: String,
}

/// One reading of a plant's sensor feed.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PlantReading {
    // ---
    pub timestamp: DateTime<Utc>,
    pub sensor_type: String,
    pub value: f64,
    pub unit: String,
}

/// Alert raised by a dangerous reading.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Alert {
    // ---
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub sensor_type: String,
    pub message: String,
    pub value: f64,
    pub unit: String,
    pub dismissed: bool,
    pub dismissed_at: Option<DateTime<Utc>>,
    pub auto_dismissed: bool,
    pub read: bool,
    pub plant_id: Option<i64>,
}

/// Plant row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Plant {
    // ---
    pub id: i64,
    pub name: String,
    pub species: Option<String>,
    pub variety: Option<String>,
    pub planted_date: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub current_stage_id: Option<i64>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Plant row joined with its current stage, as listed by `/api/plants`.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PlantSummary {
    // ---
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub plant: Plant,
    pub current_stage_name: Option<String>,
    pub current_stage_description: Option<String>,
}

/// Body of `POST /api/plants` and `PUT /api/plants/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlantInput {
    // ---
    pub name: Option<String>,
    pub species: Option<String>,
    pub variety: Option<String>,
    pub planted_date: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub current_stage_id: Option<i64>,
}

/// Growth stage with optional per-stage bands.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PlantStage {
    // ---
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub duration_days: Option<i64>,
    pub order_index: i64,
    pub temperature_min: Option<f64>,
    pub temperature_max: Option<f64>,
    pub humidity_min: Option<f64>,
    pub humidity_max: Option<f64>,
    pub soil_moisture_min: Option<f64>,
    pub soil_moisture_max: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /api/plant-stages`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlantStageInput {
    // ---
    pub name: Option<String>,
    pub description: Option<String>,
    pub duration_days: Option<i64>,
    pub order_index: Option<i64>,
    pub temperature_min: Option<f64>,
    pub temperature_max: Option<f64>,
    pub humidity_min: Option<f64>,
    pub humidity_max: Option<f64>,
    pub soil_moisture_min: Option<f64>,
    pub soil_moisture_max: Option<f64>,
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_unit_mapping() {
        // ---
        assert_eq!(unit_for("temperature"), "°C");
        assert_eq!(unit_for("humidity"), "%");
        assert_eq!(unit_for("soil_moisture"), "%");
        assert_eq!(unit_for("illuminance"), "lux");
        assert_eq!(unit_for("pressure"), "hPa");
        assert_eq!(unit_for("light"), "");
    }

    #[test]
    fn test_sensor_type_round_trip_keys() {
        // ---
        for sensor in SensorType::ALL {
            assert_eq!(SensorType::from_key(sensor.as_str()), Some(sensor));
        }
        assert_eq!(SensorType::from_key("plantId"), None);
    }

    #[test]
    fn test_new_reading_derives_unit() {
        // ---
        let reading = NewReading::new("pressure", 1013.2);
        assert_eq!(reading.unit, "hPa");
        assert_eq!(reading.value, 1013.2);
    }
}
