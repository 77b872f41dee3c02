use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Error types for cart operations
#[derive(Debug, thiserror::Error)]
pub enum CartError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Cart not found")]
    NotFound,

    #[error("Product not found: {0}")]
    ProductNotFound(i32),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<sqlx::Error> for CartError {
    fn from(err: sqlx::Error) -> Self {
        CartError::DatabaseError(err.to_string())
    }
}

impl IntoResponse for CartError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            CartError::DatabaseError(msg) => {
                tracing::error!("Cart database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            CartError::NotFound => (StatusCode::NOT_FOUND, "Cart not found".to_string()),
            CartError::ProductNotFound(id) => (
                StatusCode::BAD_REQUEST,
                format!("Product with id {} not found", id),
            ),
            CartError::InvalidQuantity(msg) => (StatusCode::BAD_REQUEST, msg),
            CartError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
