//! Sensor reading persistence.
//!
//! Readings are append-only. Every timestamp is bound from Rust so that
//! ordering and the `days` cutoff compare values written in one format.

use chrono::{DateTime, Duration, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::models::{HistoryPoint, NewReading, PlantReading, SensorReading};

// ---

/// Rows returned by the sensor history endpoint when no `limit` is given.
pub const DEFAULT_SENSOR_HISTORY_LIMIT: i64 = 500;

/// Optional window applied to history queries.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HistoryWindow {
    /// Only rows newer than `now - days` (fractional days allowed).
    pub days: Option<f64>,
    /// Maximum number of rows.
    pub limit: Option<i64>,
}

impl HistoryWindow {
    /// Lenient query-string parsing: unparseable values are ignored.
    pub fn parse(days: Option<&str>, limit: Option<&str>) -> Self {
        Self {
            days: days
                .and_then(|d| d.trim().parse::<f64>().ok())
                .filter(|d| d.is_finite()),
            limit: limit.and_then(|l| l.trim().parse::<i64>().ok()),
        }
    }

    fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.days
            .and_then(|d| Duration::try_milliseconds((d * 86_400_000.0) as i64))
            .and_then(|delta| now.checked_sub_signed(delta))
    }
}

/// Insert one row per reading on the caller's connection (usually a transaction).
pub async fn insert_batch(
    conn: &mut SqliteConnection,
    readings: &[NewReading],
    plant_id: Option<i64>,
    now: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    // ---
    let mut inserted = 0;
    for reading in readings {
        let result = sqlx::query(
            r#"
            INSERT INTO sensor_readings (timestamp, sensor_type, value, unit, plant_id)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(now)
        .bind(&reading.sensor_type)
        .bind(reading.value)
        .bind(&reading.unit)
        .bind(plant_id)
        .execute(&mut *conn)
        .await?;
        inserted += result.rows_affected();
    }
    Ok(inserted)
}

/// Newest reading of every sensor type, newest first.
pub async fn latest_per_type(pool: &SqlitePool) -> Result<Vec<SensorReading>, sqlx::Error> {
    // ---
    sqlx::query_as::<_, SensorReading>(
        r#"
        SELECT id, timestamp, sensor_type, value, unit, plant_id
        FROM (
            SELECT
                sr.*,
                ROW_NUMBER() OVER (
                    PARTITION BY sr.sensor_type
                    ORDER BY sr.timestamp DESC, sr.id DESC
                ) AS rn
            FROM sensor_readings sr
        )
        WHERE rn = 1
        ORDER BY timestamp DESC, id DESC
        "#,
    )
    .fetch_all(pool)
    .await
}

/// Chronological series for one sensor type, for charts.
pub async fn history(
    pool: &SqlitePool,
    sensor_type: &str,
    window: HistoryWindow,
    now: DateTime<Utc>,
) -> Result<Vec<HistoryPoint>, sqlx::Error> {
    // ---
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT timestamp, value, unit FROM sensor_readings WHERE sensor_type = ",
    );
    qb.push_bind(sensor_type);

    if let Some(cutoff) = window.cutoff(now) {
        qb.push(" AND timestamp >= ").push_bind(cutoff);
    }

    qb.push(" ORDER BY timestamp ASC, id ASC");

    if let Some(limit) = window.limit {
        qb.push(" LIMIT ").push_bind(limit);
    }

    qb.build_query_as::<HistoryPoint>().fetch_all(pool).await
}

/// Readings tagged with `plant_id`, newest first.
pub async fn for_plant(
    pool: &SqlitePool,
    plant_id: i64,
    sensor_type: Option<&str>,
    window: HistoryWindow,
    now: DateTime<Utc>,
) -> Result<Vec<PlantReading>, sqlx::Error> {
    // ---
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT timestamp, sensor_type, value, unit FROM sensor_readings WHERE plant_id = ",
    );
    qb.push_bind(plant_id);

    if let Some(sensor_type) = sensor_type {
        qb.push(" AND sensor_type = ").push_bind(sensor_type.to_string());
    }
    if let Some(cutoff) = window.cutoff(now) {
        qb.push(" AND timestamp >= ").push_bind(cutoff);
    }

    qb.push(" ORDER BY timestamp DESC, id DESC");

    if let Some(limit) = window.limit {
        qb.push(" LIMIT ").push_bind(limit);
    }

    qb.build_query_as::<PlantReading>().fetch_all(pool).await
}
