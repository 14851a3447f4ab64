//! Sensor ingestion and read-side endpoints.

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Map, Value};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{json_body, ApiError};
use crate::ingest::{self, SensorBatch};
use crate::models::{HistoryPoint, SensorReading};
use crate::notify::Notifier;
use crate::plant_health::{OverallHealth, PlantHealthConfig};
use crate::readings::{self, HistoryWindow, DEFAULT_SENSOR_HISTORY_LIMIT};
use crate::Config;

// ---

pub fn router() -> Router<(SqlitePool, Config)> {
    // ---
    Router::new()
        .route("/api/sensor-data", post(receive))
        .route("/api/latest-sensors", get(latest))
        .route("/api/sensor-history/{sensor_type}", get(history))
        .route("/api/health-summary", get(health_summary))
}

async fn receive(
    State((pool, config)): State<(SqlitePool, Config)>,
    Extension(notifier): Extension<Notifier>,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    // ---
    // An empty body is an empty batch
    let payload = match json_body::<Value>(&body)? {
        Value::Null => Value::Object(Map::new()),
        v => v,
    };
    let batch =
        SensorBatch::from_json(&payload).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let report = ingest::ingest(
        &pool,
        &batch,
        &PlantHealthConfig::default(),
        config.alert_active_cap,
        Utc::now(),
    )
    .await
    .map_err(ApiError::storage("Failed to save sensor data."))?;

    info!(
        "POST /api/sensor-data - stored {} readings, {} new alerts",
        report.stored,
        report.alerts_created.len()
    );
    notifier.dispatch(&pool, report.alerts_created);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Sensor data received and saved successfully." })),
    ))
}

async fn latest(
    State((pool, _)): State<(SqlitePool, Config)>,
) -> Result<Json<Vec<SensorReading>>, ApiError> {
    // ---
    let rows = readings::latest_per_type(&pool)
        .await
        .map_err(ApiError::storage("Failed to fetch latest sensor data."))?;
    debug!("GET /api/latest-sensors - {} sensor types", rows.len());
    Ok(Json(rows))
}

async fn history(
    Path(sensor_type): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    State((pool, _)): State<(SqlitePool, Config)>,
) -> Result<Json<Vec<HistoryPoint>>, ApiError> {
    // ---
    let mut window = HistoryWindow::parse(
        params.get("days").map(String::as_str),
        params.get("limit").map(String::as_str),
    );
    window.limit.get_or_insert(DEFAULT_SENSOR_HISTORY_LIMIT);

    let rows = readings::history(&pool, &sensor_type, window, Utc::now())
        .await
        .map_err(ApiError::storage(format!(
            "Failed to fetch history for {sensor_type}."
        )))?;
    Ok(Json(rows))
}

async fn health_summary(
    State((pool, _)): State<(SqlitePool, Config)>,
) -> Result<Json<OverallHealth>, ApiError> {
    // ---
    let latest = readings::latest_per_type(&pool)
        .await
        .map_err(ApiError::storage("Failed to fetch health summary."))?;
    Ok(Json(PlantHealthConfig::default().overall_health(&latest)))
}
