//! Active alerts, alert history and dismissal.

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tracing::info;

use crate::alerts::{self, DismissOptions, DEFAULT_HISTORY_LIMIT};
use crate::error::{json_body, parse_id, ApiError};
use crate::models::Alert;
use crate::Config;

// ---

const INVALID_ALERT_ID: &str = "Invalid alert ID.";

pub fn router() -> Router<(SqlitePool, Config)> {
    // ---
    Router::new()
        .route("/api/alerts", get(active))
        .route("/api/alerts/history", get(history))
        .route("/api/alerts/latest", get(latest))
        .route("/api/alerts/{id}/dismiss", post(dismiss))
}

async fn active(
    State((pool, _)): State<(SqlitePool, Config)>,
) -> Result<Json<Vec<Alert>>, ApiError> {
    // ---
    let rows = alerts::active(&pool)
        .await
        .map_err(ApiError::storage("Failed to fetch alerts."))?;
    Ok(Json(rows))
}

/// Dismiss flags are optional; only a literal JSON `true` sets one.
fn dismiss_options(body: &[u8]) -> Result<DismissOptions, ApiError> {
    // ---
    let value: Value = json_body(body)?;
    let flag = |key: &str| value.get(key).and_then(Value::as_bool) == Some(true);

    Ok(DismissOptions {
        auto_dismissed: flag("auto_dismissed"),
        mark_as_read: flag("mark_as_read"),
    })
}

async fn dismiss(
    Path(id): Path<String>,
    State((pool, _)): State<(SqlitePool, Config)>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    // ---
    let alert_id = parse_id(&id, INVALID_ALERT_ID)?;
    let options = dismiss_options(&body)?;

    let dismissed = alerts::dismiss(&pool, alert_id, options, Utc::now())
        .await
        .map_err(ApiError::storage("Failed to dismiss alert."))?;

    if !dismissed {
        return Err(ApiError::NotFound(
            "Alert not found or already dismissed.".to_string(),
        ));
    }

    info!("POST /api/alerts/{}/dismiss - dismissed", alert_id);
    Ok(Json(json!({ "message": "Alert dismissed successfully." })))
}

async fn history(
    Query(params): Query<HashMap<String, String>>,
    State((pool, _)): State<(SqlitePool, Config)>,
) -> Result<Json<Vec<Alert>>, ApiError> {
    // ---
    let limit = params
        .get("limit")
        .and_then(|l| l.trim().parse::<i64>().ok())
        .unwrap_or(DEFAULT_HISTORY_LIMIT);

    let rows = alerts::history(&pool, limit)
        .await
        .map_err(ApiError::storage("Failed to fetch alert history."))?;
    Ok(Json(rows))
}

async fn latest(
    State((pool, _)): State<(SqlitePool, Config)>,
) -> Result<Json<Option<Alert>>, ApiError> {
    // ---
    let alert = alerts::latest_active(&pool)
        .await
        .map_err(ApiError::storage("Failed to fetch latest alert."))?;
    Ok(Json(alert))
}
