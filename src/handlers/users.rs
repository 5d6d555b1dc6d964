// User handlers
// HTTP handlers exposing the stored Telegram users

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    error::{ApiError, ApiResult},
    store::{SharedStore, Table},
};

/// Get all users
/// GET /api/users
pub async fn get_all_users(
    State(store): State<SharedStore>,
) -> ApiResult<impl IntoResponse> {
    info!("Fetching all users");

    let users = store
        .get_all_rows(Table::Users)
        .await?
        .ok_or_else(|| ApiError::not_found("User data"))?;

    info!("Retrieved {} users", users.len());
    Ok((StatusCode::OK, Json(Value::Array(users))))
}

/// Get user by Telegram id
/// GET /api/users/:id
pub async fn get_user_by_id(
    State(store): State<SharedStore>,
    Path(telegram_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    info!("Fetching user with telegram_id: {}", telegram_id);

    // A malformed id can never match a row
    let Ok(id) = telegram_id.parse::<i64>() else {
        debug!("Ignoring non-numeric telegram_id: {}", telegram_id);
        return Err(ApiError::not_found(format!("User {}", telegram_id)));
    };

    let user = store
        .get_user_by_telegram_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("User {}", telegram_id)))?;

    Ok((StatusCode::OK, Json(user)))
}
