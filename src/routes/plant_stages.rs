//! Growth stage list and creation.

use axum::{body::Bytes, extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use sqlx::SqlitePool;

use super::plants::required_name;
use crate::error::{json_body, ApiError};
use crate::models::{PlantStage, PlantStageInput};
use crate::plants;
use crate::Config;

// ---

pub fn router() -> Router<(SqlitePool, Config)> {
    // ---
    Router::new().route("/api/plant-stages", get(list).post(create))
}

async fn list(
    State((pool, _)): State<(SqlitePool, Config)>,
) -> Result<Json<Vec<PlantStage>>, ApiError> {
    // ---
    let rows = plants::list_stages(&pool)
        .await
        .map_err(ApiError::storage("Failed to fetch plant stages."))?;
    Ok(Json(rows))
}

async fn create(
    State((pool, _)): State<(SqlitePool, Config)>,
    body: Bytes,
) -> Result<(StatusCode, Json<PlantStage>), ApiError> {
    // ---
    let input: PlantStageInput = json_body(&body)?;
    let name = required_name(input.name.as_deref(), "Stage name is required.")?;

    let stage = plants::create_stage(&pool, name, &input, Utc::now())
        .await
        .map_err(ApiError::storage("Failed to create plant stage."))?;
    Ok((StatusCode::CREATED, Json(stage)))
}
