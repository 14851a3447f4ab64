//! Route gateway: every subrouter is merged here so `main.rs` only sees
//! `routes::router`.

use axum::http::{HeaderValue, Method};
use axum::{Extension, Router};
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::notify::Notifier;
use crate::Config;

mod alerts;
mod health;
mod notifications;
mod plant_stages;
mod plants;
mod sensors;

// ---

/// Router with the notifier described by `config.notify`.
pub fn router(pool: SqlitePool, config: Config) -> Router {
    let notifier = Notifier::from_config(&config.notify);
    router_with_notifier(pool, config, notifier)
}

pub fn router_with_notifier(pool: SqlitePool, config: Config, notifier: Notifier) -> Router {
    // ---
    let cors = cors_layer(&config.cors_origins);

    Router::new()
        .merge(sensors::router())
        .merge(alerts::router())
        .merge(notifications::router())
        .merge(plants::router())
        .merge(plant_stages::router())
        .merge(health::router())
        .layer(Extension(notifier))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state((pool, config))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    // ---
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}
