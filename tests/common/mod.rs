#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use sqlx::SqlitePool;
use tower::util::ServiceExt;
use veridian_server::notify::{Notification, NotificationChannel, Notifier, NotifyError};
use veridian_server::{routes, schema, Config};

pub struct TestContext {
    pub pool: SqlitePool,
    pub app: Router,
}

pub async fn build_test_context() -> TestContext {
    build_with_config(Config::default()).await
}

pub async fn build_with_config(config: Config) -> TestContext {
    let notifier = Notifier::from_config(&config.notify);
    build_with_notifier(config, notifier).await
}

pub async fn build_with_notifier(mut config: Config, notifier: Notifier) -> TestContext {
    config.db_url = "sqlite::memory:".to_string();
    let pool = schema::connect(&config.db_url, 1)
        .await
        .expect("in-memory pool should open");
    schema::create_schema(&pool)
        .await
        .expect("schema should apply");

    let app = routes::router_with_notifier(pool.clone(), config, notifier);
    TestContext { pool, app }
}

/// Channel that keeps every notification it is handed.
#[derive(Clone, Default)]
pub struct RecordingChannel {
    pub sent: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingChannel {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "recording"
    }
}

pub async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    match body {
        Some(json) => {
            request_raw(app, method, uri, Some("application/json"), &json.to_string()).await
        }
        None => request_raw(app, method, uri, None, "").await,
    }
}

/// Send `body` verbatim, with a `Content-Type` header only when given.
pub async fn request_raw(
    app: &Router,
    method: &str,
    uri: &str,
    content_type: Option<&str>,
    body: &str,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(ct) = content_type {
        builder = builder.header("Content-Type", ct);
    }
    let req = builder
        .body(Body::from(body.to_string()))
        .expect("request should build");

    let resp = app
        .clone()
        .oneshot(req)
        .await
        .expect("request should be handled");

    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };

    (status, json)
}

pub async fn post_sensor_data(app: &Router, payload: Value) {
    let (status, _) = request(app, "POST", "/api/sensor-data", Some(payload)).await;
    assert_eq!(status, StatusCode::CREATED);
}
