//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use inventory::{ErrorKind, InventoryError};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request that never reached the service.
    BadRequest(String),
    /// Inventory operation error.
    Inventory(InventoryError),
}

impl ApiError {
    /// Status code the error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Inventory(err) => match err.kind() {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Validation | ErrorKind::Conflict => StatusCode::BAD_REQUEST,
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::Inventory(err) if status == StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!(error = %err, "internal server error");
                "An unexpected error occurred.".to_string()
            }
            ApiError::Inventory(err) => err.to_string(),
        };

        let body = serde_json::json!({
            "statusCode": status.as_u16(),
            "message": message,
        });
        (status, axum::Json(body)).into_response()
    }
}

impl From<InventoryError> for ApiError {
    fn from(err: InventoryError) -> Self {
        ApiError::Inventory(err)
    }
}
