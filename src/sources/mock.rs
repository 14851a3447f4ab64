//! Simulated Arduino producing a bounded random walk for every sensor.
//!
//! Each step nudges the previous value by up to `max_change`, clamps it to the
//! sensor's physical range and occasionally drifts it back toward the middle
//! of the ideal band.

use std::time::Duration;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sqlx::SqlitePool;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::ingest::{self, SensorBatch};
use crate::models::{NewReading, SensorType};
use crate::notify::Notifier;
use crate::plant_health::PlantHealthConfig;

// ---

/// Chance per step that a value drifts toward its ideal midpoint.
const DRIFT_PROBABILITY: f64 = 0.1;

/// Fraction of the distance to the ideal midpoint covered by one drift.
const DRIFT_FACTOR: f64 = 0.1;

/// Random-walk limits for one simulated sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorProfile {
    pub sensor: SensorType,
    pub start: f64,
    pub min: f64,
    pub max: f64,
    pub max_change: f64,
    pub ideal: (f64, f64),
}

impl SensorProfile {
    fn ideal_mid(&self) -> f64 {
        (self.ideal.0 + self.ideal.1) / 2.0
    }

    fn round(&self, value: f64) -> f64 {
        match self.sensor {
            SensorType::Illuminance => value.round(),
            _ => (value * 10.0).round() / 10.0,
        }
    }
}

pub const PROFILES: [SensorProfile; 5] = [
    SensorProfile {
        sensor: SensorType::Temperature,
        start: 22.5,
        min: 18.0,
        max: 32.0,
        max_change: 0.3,
        ideal: (20.0, 26.0),
    },
    SensorProfile {
        sensor: SensorType::Humidity,
        start: 65.0,
        min: 35.0,
        max: 85.0,
        max_change: 1.0,
        ideal: (55.0, 75.0),
    },
    SensorProfile {
        sensor: SensorType::SoilMoisture,
        start: 72.0,
        min: 25.0,
        max: 90.0,
        max_change: 0.8,
        ideal: (65.0, 80.0),
    },
    SensorProfile {
        sensor: SensorType::Illuminance,
        start: 450.0,
        min: 50.0,
        max: 1200.0,
        max_change: 25.0,
        ideal: (300.0, 800.0),
    },
    SensorProfile {
        sensor: SensorType::Pressure,
        start: 1013.25,
        min: 995.0,
        max: 1035.0,
        max_change: 0.5,
        ideal: (1005.0, 1025.0),
    },
];

/// Stateful generator; remembers the last value of every sensor.
#[derive(Debug, Clone)]
pub struct MockArduino {
    values: [f64; PROFILES.len()],
}

impl Default for MockArduino {
    fn default() -> Self {
        Self {
            values: PROFILES.map(|p| p.start),
        }
    }
}

impl MockArduino {
    /// Advance every sensor by one step and return the new readings.
    pub fn next_sample<R: Rng>(&mut self, rng: &mut R) -> Vec<NewReading> {
        // ---
        PROFILES
            .iter()
            .zip(self.values.iter_mut())
            .map(|(profile, current)| {
                *current = step(profile, *current, rng);
                NewReading::new(profile.sensor.as_str(), *current)
            })
            .collect()
    }
}

fn step<R: Rng>(profile: &SensorProfile, current: f64, rng: &mut R) -> f64 {
    // ---
    let direction = rng.gen::<f64>() - 0.5;
    let amount = direction * profile.max_change * (0.3 + rng.gen::<f64>() * 0.7);

    let mut next = (current + amount).clamp(profile.min, profile.max);

    if rng.gen_bool(DRIFT_PROBABILITY) {
        next += (profile.ideal_mid() - next) * DRIFT_FACTOR;
    }

    profile.round(next)
}

/// Ingest a fresh mock sample every `interval` until the task is dropped.
pub async fn run(
    pool: SqlitePool,
    health: PlantHealthConfig,
    alert_cap: u32,
    interval: Duration,
    notifier: Notifier,
) {
    // ---
    info!("Mock Arduino started, interval {:?}", interval);

    let mut arduino = MockArduino::default();
    let mut rng = StdRng::from_entropy();
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let batch = SensorBatch {
            readings: arduino.next_sample(&mut rng),
            plant_id: None,
        };
        match ingest::ingest(&pool, &batch, &health, alert_cap, Utc::now()).await {
            Ok(report) => {
                debug!(?report, "Mock sample ingested");
                notifier.dispatch(&pool, report.alerts_created);
            }
            Err(e) => error!("Failed to ingest mock sample: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_sample_covers_every_sensor() {
        // ---
        let mut arduino = MockArduino::default();
        let mut rng = StdRng::seed_from_u64(7);
        let sample = arduino.next_sample(&mut rng);

        let types: Vec<&str> = sample.iter().map(|r| r.sensor_type.as_str()).collect();
        assert_eq!(
            types,
            vec!["temperature", "humidity", "soil_moisture", "illuminance", "pressure"]
        );
        assert!(sample.iter().all(|r| !r.unit.is_empty()));
    }

    #[test]
    fn test_walk_stays_in_bounds_and_rounded() {
        // ---
        let mut arduino = MockArduino::default();
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..2_000 {
            for (reading, profile) in arduino.next_sample(&mut rng).iter().zip(PROFILES.iter()) {
                assert!(reading.value >= profile.min && reading.value <= profile.max);
                if profile.sensor == SensorType::Illuminance {
                    assert_eq!(reading.value, reading.value.round());
                } else {
                    let tenths = reading.value * 10.0;
                    assert!((tenths - tenths.round()).abs() < 1e-6);
                }
            }
        }
    }

    #[test]
    fn test_step_is_gradual() {
        // ---
        let mut rng = StdRng::seed_from_u64(1);
        let temp = PROFILES[0];
        let mut current = temp.start;

        for _ in 0..500 {
            let next = step(&temp, current, &mut rng);
            // Max random change plus the worst-case drift and rounding
            let drift = (temp.max - temp.min) * DRIFT_FACTOR;
            assert!((next - current).abs() <= temp.max_change / 2.0 + drift + 0.05);
            current = next;
        }
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        // ---
        let mut a = MockArduino::default();
        let mut b = MockArduino::default();
        let mut rng_a = StdRng::seed_from_u64(99);
        let mut rng_b = StdRng::seed_from_u64(99);

        for _ in 0..10 {
            assert_eq!(a.next_sample(&mut rng_a), b.next_sample(&mut rng_b));
        }
    }
}
