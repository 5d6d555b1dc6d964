use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tokio_postgres::error::SqlState;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::Database(ref err) => {
                tracing::error!("PostgreSQL database error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            ApiError::NotFound(ref resource) => {
                tracing::debug!("Resource not found: {}", resource);
                (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{} not found", resource),
                )
            }
            ApiError::Internal(ref err) => {
                tracing::error!("Internal server error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

// PostgreSQL error mapping
impl From<tokio_postgres::Error> for ApiError {
    fn from(err: tokio_postgres::Error) -> Self {
        match err.code() {
            Some(&SqlState::CONNECTION_EXCEPTION)
            | Some(&SqlState::CONNECTION_DOES_NOT_EXIST)
            | Some(&SqlState::CONNECTION_FAILURE) => {
                ApiError::Database(format!("Database connection unavailable: {}", err))
            }
            Some(&SqlState::UNDEFINED_TABLE) => {
                ApiError::Database(format!("Table is missing, migrations not applied: {}", err))
            }
            Some(&SqlState::INSUFFICIENT_PRIVILEGE) => {
                ApiError::Database(format!("Database access denied: {}", err))
            }
            // No SQLSTATE means the failure happened before the server answered
            None => ApiError::Database(format!("Database unreachable: {}", err)),
            Some(code) => {
                ApiError::Database(format!("Database operation failed ({}): {}", code.code(), err))
            }
        }
    }
}

// Result type alias for convenience
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn render(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_not_found_envelope() {
        let (status, body) = render(ApiError::not_found("User 42")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
        assert_eq!(body["error"]["message"], "User 42 not found");
    }

    #[tokio::test]
    async fn test_database_error_hides_details() {
        let (status, body) = render(ApiError::Database("password authentication failed".into())).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "DATABASE_ERROR");
        assert!(!body.to_string().contains("password"));
    }

    #[tokio::test]
    async fn test_internal_error_status() {
        let (status, body) = render(ApiError::from(anyhow::anyhow!("column type OID 600"))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
    }
}
