//! Database schema management for `veridian-server`.
//!
//! Opens the SQLite pool and ensures required tables and indexes exist before
//! serving requests. Applied once on startup from `main.rs` (EMBP: single
//! gateway call).

use std::str::FromStr;

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

// ---

/// Open a pool against `db_url`, creating the database file if needed.
///
/// File databases run in WAL mode so dashboard reads do not block ingestion.
pub async fn connect(db_url: &str, max_connections: u32) -> Result<SqlitePool> {
    // ---
    let options = SqliteConnectOptions::from_str(db_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect_with(options)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to open database '{}': {}", db_url, e))?;

    Ok(pool)
}

/// Create or update the database schema (idempotent).
///
/// Safe to call on every startup; no-op if objects already exist.
///
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    for statement in STATEMENTS {
        sqlx::query(statement).execute(&mut *tx).await?;
    }

    tx.commit().await?;
    Ok(())
}

const STATEMENTS: &[&str] = &[
    // Raw readings; append only
    r#"
    CREATE TABLE IF NOT EXISTS sensor_readings (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp   TEXT    NOT NULL,
        sensor_type TEXT    NOT NULL,
        value       REAL    NOT NULL,
        unit        TEXT    NOT NULL DEFAULT '',
        plant_id    INTEGER
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_sensor_readings_type_ts
        ON sensor_readings (sensor_type, timestamp)
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_sensor_readings_plant
        ON sensor_readings (plant_id, timestamp)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS alerts (
        id             INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp      TEXT    NOT NULL,
        sensor_type    TEXT    NOT NULL,
        message        TEXT    NOT NULL,
        value          REAL    NOT NULL,
        unit           TEXT    NOT NULL DEFAULT '',
        dismissed      INTEGER NOT NULL DEFAULT 0,
        dismissed_at   TEXT,
        auto_dismissed INTEGER NOT NULL DEFAULT 0,
        read           INTEGER NOT NULL DEFAULT 0,
        plant_id       INTEGER
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_alerts_dismissed_ts
        ON alerts (dismissed, timestamp)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS plant_stages (
        id                INTEGER PRIMARY KEY AUTOINCREMENT,
        name              TEXT    NOT NULL,
        description       TEXT,
        duration_days     INTEGER,
        order_index       INTEGER NOT NULL DEFAULT 0,
        temperature_min   REAL,
        temperature_max   REAL,
        humidity_min      REAL,
        humidity_max      REAL,
        soil_moisture_min REAL,
        soil_moisture_max REAL,
        created_at        TEXT    NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS plants (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        name             TEXT    NOT NULL,
        species          TEXT,
        variety          TEXT,
        planted_date     TEXT,
        location         TEXT,
        notes            TEXT,
        current_stage_id INTEGER REFERENCES plant_stages (id),
        active           INTEGER NOT NULL DEFAULT 1,
        created_at       TEXT    NOT NULL,
        updated_at       TEXT    NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS plant_stage_history (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        plant_id   INTEGER NOT NULL REFERENCES plants (id),
        stage_id   INTEGER NOT NULL REFERENCES plant_stages (id),
        changed_at TEXT    NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        username      TEXT    NOT NULL UNIQUE,
        email         TEXT    UNIQUE,
        password_hash TEXT    NOT NULL,
        full_name     TEXT,
        is_active     INTEGER NOT NULL DEFAULT 1,
        is_admin      INTEGER NOT NULL DEFAULT 0,
        created_at    TEXT    DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user_settings (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id       INTEGER NOT NULL REFERENCES users (id),
        setting_key   TEXT    NOT NULL,
        setting_value TEXT,
        setting_type  TEXT    NOT NULL DEFAULT 'string',
        updated_at    TEXT    DEFAULT CURRENT_TIMESTAMP,
        UNIQUE (user_id, setting_key)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS settings (
        key   TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS automation_logs (
        id        INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT    DEFAULT CURRENT_TIMESTAMP,
        action    TEXT    NOT NULL,
        status    TEXT    NOT NULL,
        details   TEXT
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_automation_logs_ts
        ON automation_logs (timestamp)
    "#,
];
