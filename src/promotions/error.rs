use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Error types for promotion operations
///
/// Eligibility failures of *candidate* promotions are not errors; they are
/// returned as data so batch evaluation can continue. Only explicitly
/// requested promotions that fail produce `CouponNotEligible` /
/// `CampaignNotEligible`.
#[derive(Debug, thiserror::Error)]
pub enum PromotionError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Coupon code not found: {0}")]
    CouponNotFound(String),

    #[error("Campaign not found: {0}")]
    CampaignNotFound(i32),

    #[error("Coupon {code} cannot be applied: {reason}")]
    CouponNotEligible { code: String, reason: String },

    #[error("Campaign {id} cannot be applied: {reason}")]
    CampaignNotEligible { id: i32, reason: String },

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<sqlx::Error> for PromotionError {
    fn from(err: sqlx::Error) -> Self {
        PromotionError::DatabaseError(err.to_string())
    }
}

impl From<crate::cart::CartError> for PromotionError {
    fn from(err: crate::cart::CartError) -> Self {
        match err {
            crate::cart::CartError::DatabaseError(msg) => PromotionError::DatabaseError(msg),
            other => PromotionError::ValidationError(other.to_string()),
        }
    }
}

impl IntoResponse for PromotionError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            PromotionError::DatabaseError(msg) => {
                tracing::error!("Promotion database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            PromotionError::CouponNotFound(code) => (
                StatusCode::NOT_FOUND,
                format!("Coupon code {} not found", code),
            ),
            PromotionError::CampaignNotFound(id) => {
                (StatusCode::NOT_FOUND, format!("Campaign {} not found", id))
            }
            ref err @ PromotionError::CouponNotEligible { .. } => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            ref err @ PromotionError::CampaignNotEligible { .. } => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            PromotionError::EmptyCart => (StatusCode::BAD_REQUEST, "Cart is empty".to_string()),
            PromotionError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
