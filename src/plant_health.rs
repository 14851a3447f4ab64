//! Plant health classification against static threshold bands.
//!
//! Every known sensor has an `ideal` band nested inside an `ok` band; a value
//! outside both is `dangerous`. Bounds are inclusive.

use std::collections::HashMap;

use serde::Serialize;

use crate::models::{SensorReading, SensorType};

// ---

/// Three-tier health classification of a sensor value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ideal,
    Ok,
    Dangerous,
}

/// Inclusive `[min, max]` band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub min: f64,
    pub max: f64,
}

impl Band {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Bands configured for one sensor.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HealthRange {
    pub ideal: Option<Band>,
    pub ok: Option<Band>,
}

/// Health bands for a plant at a given stage.
#[derive(Debug, Clone)]
pub struct PlantHealthConfig {
    pub name: String,
    pub stage: String,
    pub ranges: HashMap<SensorType, HealthRange>,
}

impl Default for PlantHealthConfig {
    /// General houseplant in the vegetative stage.
    fn default() -> Self {
        // ---
        let ranges = HashMap::from([
            (
                SensorType::Temperature,
                HealthRange {
                    ideal: Some(Band::new(20.0, 26.0)),
                    ok: Some(Band::new(18.0, 30.0)),
                },
            ),
            (
                SensorType::Humidity,
                HealthRange {
                    ideal: Some(Band::new(50.0, 70.0)),
                    ok: Some(Band::new(40.0, 80.0)),
                },
            ),
            (
                SensorType::SoilMoisture,
                HealthRange {
                    ideal: Some(Band::new(40.0, 60.0)),
                    ok: Some(Band::new(30.0, 80.0)),
                },
            ),
            (
                SensorType::Illuminance,
                HealthRange {
                    ideal: Some(Band::new(200.0, 800.0)),
                    ok: Some(Band::new(100.0, 1000.0)),
                },
            ),
            (
                SensorType::Pressure,
                HealthRange {
                    ideal: Some(Band::new(1000.0, 1020.0)),
                    ok: Some(Band::new(980.0, 1040.0)),
                },
            ),
        ]);

        Self {
            name: "General Houseplant".to_string(),
            stage: "vegetative".to_string(),
            ranges,
        }
    }
}

impl PlantHealthConfig {
    /// Bands for `sensor_type`, or `None` for display-only sensors.
    pub fn range(&self, sensor_type: &str) -> Option<&HealthRange> {
        SensorType::from_key(sensor_type).and_then(|s| self.ranges.get(&s))
    }

    /// Classify `value` for `sensor_type`.
    ///
    /// Sensors without configured bands are always `Ideal`.
    pub fn classify(&self, sensor_type: &str, value: f64) -> HealthStatus {
        // ---
        let Some(range) = self.range(sensor_type) else {
            return HealthStatus::Ideal;
        };

        if range.ideal.is_some_and(|b| b.contains(value)) {
            return HealthStatus::Ideal;
        }
        if range.ok.is_some_and(|b| b.contains(value)) {
            return HealthStatus::Ok;
        }
        if range.ideal.is_none() && range.ok.is_none() {
            return HealthStatus::Ideal;
        }

        HealthStatus::Dangerous
    }

    /// Average dashboard score over the latest reading of each sensor.
    pub fn overall_health(&self, readings: &[SensorReading]) -> OverallHealth {
        // ---
        if readings.is_empty() {
            return OverallHealth {
                score: 0.0,
                status: "unknown",
                sensors: 0,
            };
        }

        let total: f64 = readings
            .iter()
            .map(|r| match self.classify(&r.sensor_type, r.value) {
                HealthStatus::Ideal => 100.0,
                HealthStatus::Ok => 60.0,
                HealthStatus::Dangerous => 20.0,
            })
            .sum();
        let score = total / readings.len() as f64;

        let status = if score >= 80.0 {
            "excellent"
        } else if score >= 60.0 {
            "good"
        } else if score >= 40.0 {
            "fair"
        } else {
            "poor"
        };

        OverallHealth {
            score,
            status,
            sensors: readings.len(),
        }
    }
}

/// Response body of `/api/health-summary`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallHealth {
    pub score: f64,
    pub status: &'static str,
    pub sensors: usize,
}

/// Human readable sensor name: first `_` becomes a space, words capitalised.
pub fn display_name(sensor_type: &str) -> String {
    // ---
    let spaced = sensor_type.replacen('_', " ", 1);
    let mut out = String::with_capacity(spaced.len());
    let mut at_word_start = true;

    for ch in spaced.chars() {
        if at_word_start && ch.is_alphanumeric() {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
        at_word_start = !(ch.is_alphanumeric() || ch == '_');
    }
    out
}

/// Status line shown in alerts and on the dashboard.
pub fn status_message(status: HealthStatus, sensor_type: &str) -> String {
    let name = display_name(sensor_type);
    match status {
        HealthStatus::Ideal => format!("{name} is in the ideal range"),
        HealthStatus::Ok => format!("{name} is acceptable but could be better"),
        HealthStatus::Dangerous => {
            format!("{name} is in a dangerous range! Immediate attention needed")
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::Utc;

    fn reading(sensor_type: &str, value: f64) -> SensorReading {
        SensorReading {
            id: 0,
            timestamp: Utc::now(),
            sensor_type: sensor_type.to_string(),
            value,
            unit: String::new(),
            plant_id: None,
        }
    }

    #[test]
    fn test_temperature_bands() {
        // ---
        let cfg = PlantHealthConfig::default();
        assert_eq!(cfg.classify("temperature", 22.0), HealthStatus::Ideal);
        assert_eq!(cfg.classify("temperature", 29.0), HealthStatus::Ok);
        assert_eq!(cfg.classify("temperature", 35.5), HealthStatus::Dangerous);
        assert_eq!(cfg.classify("temperature", 17.9), HealthStatus::Dangerous);

        // Edges are inclusive
        assert_eq!(cfg.classify("temperature", 20.0), HealthStatus::Ideal);
        assert_eq!(cfg.classify("temperature", 30.0), HealthStatus::Ok);
        assert_eq!(cfg.classify("temperature", 18.0), HealthStatus::Ok);
    }

    #[test]
    fn test_extreme_payload_is_all_dangerous() {
        // ---
        let cfg = PlantHealthConfig::default();
        assert_eq!(cfg.classify("humidity", 90.0), HealthStatus::Dangerous);
        assert_eq!(cfg.classify("soil_moisture", 20.0), HealthStatus::Dangerous);
        assert_eq!(cfg.classify("illuminance", 50.0), HealthStatus::Dangerous);
        assert_eq!(cfg.classify("pressure", 950.0), HealthStatus::Dangerous);
    }

    #[test]
    fn test_unknown_sensor_is_ideal() {
        // ---
        let cfg = PlantHealthConfig::default();
        assert_eq!(cfg.classify("light", -1000.0), HealthStatus::Ideal);
    }

    #[test]
    fn test_sensor_without_bands_is_ideal() {
        // ---
        let mut cfg = PlantHealthConfig::default();
        cfg.ranges.insert(SensorType::Pressure, HealthRange::default());
        assert_eq!(cfg.classify("pressure", 1.0), HealthStatus::Ideal);
    }

    #[test]
    fn test_status_messages() {
        // ---
        assert_eq!(display_name("soil_moisture"), "Soil Moisture");
        assert_eq!(display_name("temperature"), "Temperature");
        assert_eq!(
            status_message(HealthStatus::Dangerous, "temperature"),
            "Temperature is in a dangerous range! Immediate attention needed"
        );
        assert_eq!(
            status_message(HealthStatus::Ok, "soil_moisture"),
            "Soil Moisture is acceptable but could be better"
        );
        assert!(status_message(HealthStatus::Ideal, "humidity").ends_with("ideal range"));
    }

    #[test]
    fn test_overall_health() {
        // ---
        let cfg = PlantHealthConfig::default();

        let empty = cfg.overall_health(&[]);
        assert_eq!(empty.status, "unknown");
        assert_eq!(empty.score, 0.0);

        // 100 + 60 + 20 = 180 / 3 = 60 -> good
        let mixed = cfg.overall_health(&[
            reading("temperature", 22.0),
            reading("humidity", 45.0),
            reading("pressure", 900.0),
        ]);
        assert_eq!(mixed.score, 60.0);
        assert_eq!(mixed.status, "good");
        assert_eq!(mixed.sensors, 3);

        let poor = cfg.overall_health(&[reading("temperature", 40.0)]);
        assert_eq!(poor.status, "poor");
    }
}
