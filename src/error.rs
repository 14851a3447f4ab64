//! JSON error responses shared by all route handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;
use tracing::error;

// ---

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{message}")]
    Storage {
        message: String,
        #[source]
        source: sqlx::Error,
    },
}

impl ApiError {
    /// Adapter for `map_err` that wraps a database error with a client-facing message.
    pub fn storage(message: impl Into<String>) -> impl FnOnce(sqlx::Error) -> ApiError {
        let message = message.into();
        move |source| ApiError::Storage { message, source }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // ---
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "message": message }))).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "message": message }))).into_response()
            }
            ApiError::Storage { message, source } => {
                error!("{}: {}", message, source);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": message, "error": source.to_string() })),
                )
                    .into_response()
            }
        }
    }
}

/// Parse a numeric path id; anything else is a 400 with `message`.
pub fn parse_id(raw: &str, message: &str) -> Result<i64, ApiError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| ApiError::BadRequest(message.to_string()))
}

/// Decode a JSON request body regardless of `Content-Type`.
///
/// An empty body yields `T::default()`; malformed JSON is a 400 with the
/// usual `{message}` shape.
pub fn json_body<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, ApiError> {
    // ---
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {e}")))
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_parse_id() {
        // ---
        assert_eq!(parse_id("42", "bad").unwrap(), 42);
        assert!(matches!(parse_id("abc", "bad"), Err(ApiError::BadRequest(m)) if m == "bad"));
        assert!(parse_id("1.5", "bad").is_err());
        assert!(parse_id("", "bad").is_err());
    }

    #[test]
    fn test_status_codes() {
        // ---
        let resp = ApiError::NotFound("gone".into()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = ApiError::storage("Failed to fetch alerts.")(sqlx::Error::RowNotFound)
            .into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_json_body() {
        // ---
        let empty: serde_json::Value = json_body(b"  ").unwrap();
        assert!(empty.is_null());

        let map: serde_json::Map<String, serde_json::Value> =
            json_body(br#"{"temperature": 21.5}"#).unwrap();
        assert_eq!(map["temperature"], 21.5);

        let err = json_body::<serde_json::Value>(b"{\"name\": ").unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(m) if m.starts_with("Invalid request body")));
    }
}
