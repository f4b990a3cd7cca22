//! HTTP handlers for expense-service.

pub mod sync;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "service": "expense-service" })),
    )
}

pub async fn metrics() -> impl IntoResponse {
    crate::services::get_metrics()
}
