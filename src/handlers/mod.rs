// Handlers module
// HTTP handlers for the read-only API

pub mod users;

use axum::{http::StatusCode, response::IntoResponse};

/// Liveness probe, does not touch the database
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
