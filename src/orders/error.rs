use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::promotions::PromotionError;

/// Error types for order operations
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Order not found")]
    NotFound,

    #[error("Cart is empty")]
    CartEmpty,

    #[error("Insufficient stock for {0}")]
    InsufficientStock(String),

    #[error("Usage limit reached for {0}")]
    UsageLimitExceeded(String),

    #[error("Cart has already been checked out")]
    CartAlreadyConverted,

    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Promotion(#[from] PromotionError),
}

impl From<sqlx::Error> for OrderError {
    fn from(err: sqlx::Error) -> Self {
        OrderError::DatabaseError(err.to_string())
    }
}

impl From<crate::cart::CartError> for OrderError {
    fn from(err: crate::cart::CartError) -> Self {
        match err {
            crate::cart::CartError::DatabaseError(msg) => OrderError::DatabaseError(msg),
            other => OrderError::ValidationError(other.to_string()),
        }
    }
}

impl IntoResponse for OrderError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            OrderError::DatabaseError(msg) => {
                tracing::error!("Order database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            OrderError::NotFound => (StatusCode::NOT_FOUND, "Order not found".to_string()),
            OrderError::CartEmpty => (StatusCode::BAD_REQUEST, "Cart is empty".to_string()),
            ref err @ OrderError::InsufficientStock(_) => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            // The commit-time re-check lost a race the advisory check won;
            // the order was rolled back whole
            ref err @ OrderError::UsageLimitExceeded(_) => {
                (StatusCode::CONFLICT, err.to_string())
            }
            ref err @ OrderError::CartAlreadyConverted => {
                (StatusCode::CONFLICT, err.to_string())
            }
            OrderError::InvalidTransition(msg) => (StatusCode::BAD_REQUEST, msg),
            OrderError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            OrderError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            OrderError::Promotion(err) => return err.into_response(),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
