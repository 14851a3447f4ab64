//! Plant CRUD and per-plant sensor feed.

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tracing::info;

use crate::error::{json_body, parse_id, ApiError};
use crate::models::{Plant, PlantInput, PlantReading, PlantSummary};
use crate::plants::{self, UpdateOutcome};
use crate::readings::{self, HistoryWindow};
use crate::Config;

// ---

const INVALID_PLANT_ID: &str = "Invalid plant ID.";
const PLANT_NOT_FOUND: &str = "Plant not found.";

pub fn router() -> Router<(SqlitePool, Config)> {
    // ---
    Router::new()
        .route("/api/plants", get(list).post(create))
        .route("/api/plants/{id}", get(show).put(update).delete(deactivate))
        .route("/api/plants/{id}/sensor-data", get(sensor_data))
}

/// Trimmed non-empty `name`, or a 400 with `message`.
pub(crate) fn required_name<'a>(name: Option<&'a str>, message: &str) -> Result<&'a str, ApiError> {
    name.map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::BadRequest(message.to_string()))
}

async fn list(
    State((pool, _)): State<(SqlitePool, Config)>,
) -> Result<Json<Vec<PlantSummary>>, ApiError> {
    // ---
    let rows = plants::list_active(&pool)
        .await
        .map_err(ApiError::storage("Failed to fetch plants."))?;
    Ok(Json(rows))
}

async fn show(
    Path(id): Path<String>,
    State((pool, _)): State<(SqlitePool, Config)>,
) -> Result<Json<Plant>, ApiError> {
    // ---
    let plant_id = parse_id(&id, INVALID_PLANT_ID)?;

    plants::find(&pool, plant_id)
        .await
        .map_err(ApiError::storage("Failed to fetch plant."))?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(PLANT_NOT_FOUND.to_string()))
}

async fn create(
    State((pool, _)): State<(SqlitePool, Config)>,
    body: Bytes,
) -> Result<(StatusCode, Json<Plant>), ApiError> {
    // ---
    let input: PlantInput = json_body(&body)?;
    let name = required_name(input.name.as_deref(), "Plant name is required.")?;

    let plant = plants::create(&pool, name, &input, Utc::now())
        .await
        .map_err(ApiError::storage("Failed to create plant."))?;
    Ok((StatusCode::CREATED, Json(plant)))
}

async fn update(
    Path(id): Path<String>,
    State((pool, _)): State<(SqlitePool, Config)>,
    body: Bytes,
) -> Result<Json<Plant>, ApiError> {
    // ---
    let plant_id = parse_id(&id, INVALID_PLANT_ID)?;
    let input: PlantInput = json_body(&body)?;
    let name = required_name(input.name.as_deref(), "Plant name is required.")?;

    let outcome = plants::update(&pool, plant_id, name, &input, Utc::now())
        .await
        .map_err(ApiError::storage("Failed to update plant."))?;

    match outcome {
        UpdateOutcome::Updated(plant) => Ok(Json(plant)),
        UpdateOutcome::NotFound => Err(ApiError::NotFound(PLANT_NOT_FOUND.to_string())),
        UpdateOutcome::UnknownStage(stage_id) => {
            info!("PUT /api/plants/{} - unknown stage {}", plant_id, stage_id);
            Err(ApiError::BadRequest("Unknown plant stage.".to_string()))
        }
    }
}

async fn deactivate(
    Path(id): Path<String>,
    State((pool, _)): State<(SqlitePool, Config)>,
) -> Result<Json<Value>, ApiError> {
    // ---
    let plant_id = parse_id(&id, INVALID_PLANT_ID)?;

    let found = plants::deactivate(&pool, plant_id, Utc::now())
        .await
        .map_err(ApiError::storage("Failed to deactivate plant."))?;
    if !found {
        return Err(ApiError::NotFound(PLANT_NOT_FOUND.to_string()));
    }

    Ok(Json(json!({ "message": "Plant deactivated successfully." })))
}

async fn sensor_data(
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    State((pool, _)): State<(SqlitePool, Config)>,
) -> Result<Json<Vec<PlantReading>>, ApiError> {
    // ---
    let plant_id = parse_id(&id, INVALID_PLANT_ID)?;
    let sensor_type = params
        .get("sensorType")
        .map(String::as_str)
        .filter(|s| !s.is_empty());
    let window = HistoryWindow::parse(
        params.get("days").map(String::as_str),
        params.get("limit").map(String::as_str),
    );

    let rows = readings::for_plant(&pool, plant_id, sensor_type, window, Utc::now())
        .await
        .map_err(ApiError::storage("Failed to fetch plant sensor data."))?;
    Ok(Json(rows))
}
