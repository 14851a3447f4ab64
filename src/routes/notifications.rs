//! Notification tray: unread alerts, read receipts and a test send.

use axum::{
    body::Bytes,
    extract::{Extension, Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{Local, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tracing::info;

use crate::alerts;
use crate::error::{json_body, parse_id, ApiError};
use crate::models::Alert;
use crate::notify::{Notification, Notifier};
use crate::Config;

// ---

pub fn router() -> Router<(SqlitePool, Config)> {
    // ---
    Router::new()
        .route("/api/notifications/tray", get(tray))
        .route("/api/notifications/unread-count", get(unread_count))
        .route("/api/notifications/{id}/mark-read", post(mark_read))
        .route("/api/notifications/test", post(send_test))
}

async fn tray(State((pool, _)): State<(SqlitePool, Config)>) -> Result<Json<Vec<Alert>>, ApiError> {
    // ---
    let rows = alerts::tray(&pool)
        .await
        .map_err(ApiError::storage("Failed to fetch notification tray."))?;
    Ok(Json(rows))
}

async fn unread_count(
    State((pool, _)): State<(SqlitePool, Config)>,
) -> Result<Json<Value>, ApiError> {
    // ---
    let count = alerts::unread_count(&pool)
        .await
        .map_err(ApiError::storage("Failed to fetch unread count."))?;
    Ok(Json(json!({ "count": count })))
}

async fn mark_read(
    Path(id): Path<String>,
    State((pool, _)): State<(SqlitePool, Config)>,
) -> Result<Json<Value>, ApiError> {
    // ---
    let alert_id = parse_id(&id, "Invalid alert ID.")?;

    let found = alerts::mark_read(&pool, alert_id)
        .await
        .map_err(ApiError::storage("Failed to mark notification as read."))?;
    if !found {
        return Err(ApiError::NotFound("Notification not found.".to_string()));
    }

    Ok(Json(json!({ "message": "Notification marked as read." })))
}

#[derive(Debug, Default, Deserialize)]
struct TestNotification {
    title: Option<String>,
    message: Option<String>,
}

/// Push a custom notification through every configured channel.
async fn send_test(
    Extension(notifier): Extension<Notifier>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    // ---
    let input: TestNotification = json_body(&body)?;
    let notification = Notification::custom(
        input.title.unwrap_or_else(|| "Test Notification".to_string()),
        input
            .message
            .unwrap_or_else(|| "This is a test notification from the plant monitor.".to_string()),
        Utc::now(),
    );

    let results = notifier.notify(&notification, Local::now().time()).await;
    info!("POST /api/notifications/test - {} channel results", results.len());

    Ok(Json(json!({
        "message": "Test notification sent",
        "results": results,
    })))
}
