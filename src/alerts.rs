//! Alert lifecycle: create-if-not-duplicate, capped active set, dismiss and
//! read transitions.
//!
//! Invariants maintained after every ingestion:
//! - at most one active (`dismissed = 0`) alert per `sensor_type`
//! - at most `cap` active alerts; the oldest are auto-dismissed first
//!
//! Creation and eviction take a `&mut SqliteConnection` so the ingestion path
//! can run them inside the same transaction as the reading inserts. Alerts
//! are never deleted.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{info, warn};

use crate::models::{Alert, NewReading};
use crate::plant_health::{status_message, HealthStatus, PlantHealthConfig};

// ---

/// Default number of alerts allowed to stay active at once.
pub const DEFAULT_ACTIVE_CAP: u32 = 3;

/// Default page size of the alert history.
pub const DEFAULT_HISTORY_LIMIT: i64 = 50;

const SELECT_ALERT: &str = r#"
    SELECT id, timestamp, sensor_type, message, value, unit,
           dismissed, dismissed_at, auto_dismissed, read, plant_id
    FROM alerts
"#;

/// Flags applied together with a dismissal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DismissOptions {
    pub auto_dismissed: bool,
    pub mark_as_read: bool,
}

/// Insert an alert for every dangerous reading whose sensor type has no
/// active alert yet. Returns the ids of the new alerts.
///
/// Active sensor types are read once up front and extended as alerts are
/// created, so a batch repeating a sensor type raises at most one alert.
pub async fn create_for_readings(
    conn: &mut SqliteConnection,
    readings: &[NewReading],
    plant_id: Option<i64>,
    health: &PlantHealthConfig,
    now: DateTime<Utc>,
) -> Result<Vec<i64>, sqlx::Error> {
    // ---
    let active: Vec<(String,)> =
        sqlx::query_as("SELECT DISTINCT sensor_type FROM alerts WHERE dismissed = 0")
            .fetch_all(&mut *conn)
            .await?;
    let mut active: HashSet<String> = active.into_iter().map(|(s,)| s).collect();

    let mut created = Vec::new();
    for reading in readings {
        if health.range(&reading.sensor_type).is_none() {
            continue;
        }
        let status = health.classify(&reading.sensor_type, reading.value);
        if status != HealthStatus::Dangerous || active.contains(&reading.sensor_type) {
            continue;
        }

        let message = status_message(status, &reading.sensor_type);
        let id = sqlx::query(
            r#"
            INSERT INTO alerts (timestamp, sensor_type, message, value, unit, plant_id)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(now)
        .bind(&reading.sensor_type)
        .bind(&message)
        .bind(reading.value)
        .bind(&reading.unit)
        .bind(plant_id)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();

        info!(
            alert_id = id,
            sensor_type = %reading.sensor_type,
            value = reading.value,
            "Created alert: {}",
            message
        );
        active.insert(reading.sensor_type.clone());
        created.push(id);
    }

    Ok(created)
}

/// Auto-dismiss the oldest active alerts until at most `cap` remain.
///
/// Eviction is FIFO by `timestamp`, ties broken by insertion order. Returns
/// the number of alerts dismissed.
pub async fn enforce_active_cap(
    conn: &mut SqliteConnection,
    cap: u32,
    now: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    // ---
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM alerts WHERE dismissed = 0")
        .fetch_one(&mut *conn)
        .await?;

    let excess = count - i64::from(cap);
    if excess <= 0 {
        return Ok(0);
    }

    let evicted = sqlx::query(
        r#"
        UPDATE alerts
        SET dismissed = 1, dismissed_at = ?, auto_dismissed = 1
        WHERE id IN (
            SELECT id FROM alerts
            WHERE dismissed = 0
            ORDER BY timestamp ASC, id ASC
            LIMIT ?
        )
        "#,
    )
    .bind(now)
    .bind(excess)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    info!(evicted, cap, "Auto-dismissed oldest alerts");
    Ok(evicted)
}

/// Move an active alert to dismissed.
///
/// Returns `false` when the alert does not exist or is already dismissed; in
/// that case nothing is written and the original `dismissed_at` is kept.
pub async fn dismiss(
    pool: &SqlitePool,
    alert_id: i64,
    options: DismissOptions,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    // ---
    let changed = sqlx::query(
        r#"
        UPDATE alerts
        SET dismissed = 1, dismissed_at = ?, auto_dismissed = ?, read = ?
        WHERE id = ? AND dismissed = 0
        "#,
    )
    .bind(now)
    .bind(options.auto_dismissed)
    .bind(options.mark_as_read)
    .bind(alert_id)
    .execute(pool)
    .await?
    .rows_affected();

    if changed == 0 {
        warn!(alert_id, "Alert not found or already dismissed");
        return Ok(false);
    }

    info!(
        alert_id,
        auto = options.auto_dismissed,
        read = options.mark_as_read,
        "Dismissed alert"
    );
    Ok(true)
}

/// Mark an alert read. Idempotent; returns `false` only for unknown ids.
pub async fn mark_read(pool: &SqlitePool, alert_id: i64) -> Result<bool, sqlx::Error> {
    // ---
    let changed = sqlx::query("UPDATE alerts SET read = 1 WHERE id = ?")
        .bind(alert_id)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(changed > 0)
}

/// Active alerts, newest first.
pub async fn active(pool: &SqlitePool) -> Result<Vec<Alert>, sqlx::Error> {
    sqlx::query_as::<_, Alert>(&format!(
        "{SELECT_ALERT} WHERE dismissed = 0 ORDER BY timestamp DESC, id DESC"
    ))
    .fetch_all(pool)
    .await
}

/// Newest active alert, for the main notification banner.
pub async fn latest_active(pool: &SqlitePool) -> Result<Option<Alert>, sqlx::Error> {
    sqlx::query_as::<_, Alert>(&format!(
        "{SELECT_ALERT} WHERE dismissed = 0 ORDER BY timestamp DESC, id DESC LIMIT 1"
    ))
    .fetch_optional(pool)
    .await
}

/// All alerts, newest first.
pub async fn history(pool: &SqlitePool, limit: i64) -> Result<Vec<Alert>, sqlx::Error> {
    sqlx::query_as::<_, Alert>(&format!(
        "{SELECT_ALERT} ORDER BY timestamp DESC, id DESC LIMIT ?"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Dismissed alerts not yet read.
pub async fn tray(pool: &SqlitePool) -> Result<Vec<Alert>, sqlx::Error> {
    sqlx::query_as::<_, Alert>(&format!(
        "{SELECT_ALERT} WHERE dismissed = 1 AND read = 0 ORDER BY timestamp DESC, id DESC"
    ))
    .fetch_all(pool)
    .await
}

/// Number of tray items, for the notification badge.
pub async fn unread_count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM alerts WHERE dismissed = 1 AND read = 0")
            .fetch_one(pool)
            .await?;
    Ok(count)
}

/// Single alert by id.
pub async fn find(pool: &SqlitePool, alert_id: i64) -> Result<Option<Alert>, sqlx::Error> {
    sqlx::query_as::<_, Alert>(&format!("{SELECT_ALERT} WHERE id = ?"))
        .bind(alert_id)
        .fetch_optional(pool)
        .await
}
