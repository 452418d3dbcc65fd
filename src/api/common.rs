use axum::{
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::error::StoreError;

pub fn error_response(status: StatusCode, details: impl Into<String>) -> Response {
    let body = json!({
        "error": {
            "status": status.as_u16(),
            "message": status.canonical_reason().unwrap_or_default(),
            "details": details.into(),
        }
    });

    (status, Json(body)).into_response()
}

pub fn store_error_response(err: StoreError) -> Response {
    let status = match err {
        StoreError::QueueFull { .. } => StatusCode::SERVICE_UNAVAILABLE,
        StoreError::InvalidDuration(_)
        | StoreError::InvalidPlugName
        | StoreError::NonFiniteMetric { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        error!("Database request failed: {}", err);
    }

    error_response(status, err.to_string())
}

pub async fn not_found(uri: Uri) -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        format!("API endpoint \"{}\" does not exist", uri),
    )
}
