// HTTP handlers for promotion endpoints

use axum::{extract::State, Json};
use std::collections::HashMap;
use validator::Validate;

use crate::auth::AuthenticatedUser;
use crate::promotions::{
    ApplicableDiscounts, CartLine, CouponValidation, OrderTotals, PromotionError, QuoteRequest,
    ValidateCouponRequest,
};

/// Load the user's active cart as discount-engine lines
///
/// Returns an empty list when there is no active cart; callers decide
/// whether that is an error.
pub(crate) async fn load_cart_lines(
    state: &crate::AppState,
    user_id: i32,
) -> Result<Vec<CartLine>, PromotionError> {
    let cart = match state.cart_repo.find_active_by_user(user_id).await? {
        Some(cart) => cart,
        None => return Ok(Vec::new()),
    };
    let items = state.cart_repo.find_items(cart.id).await?;
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let product_ids: Vec<i32> = items.iter().map(|item| item.product_id).collect();
    let products = state
        .product_repo
        .find_by_ids(&product_ids)
        .await
        .map_err(|e| PromotionError::DatabaseError(e.to_string()))?;
    let categories: HashMap<i32, Option<i32>> = products
        .into_iter()
        .map(|product| (product.id, product.category_id))
        .collect();

    Ok(items
        .into_iter()
        .map(|item| CartLine {
            product_id: item.product_id,
            quantity: item.quantity,
            price: item.price,
            category_id: categories.get(&item.product_id).copied().flatten(),
        })
        .collect())
}

/// Handler for POST /api/promotions/validate-coupon
/// Validates a coupon code against an order amount
#[utoipa::path(
    post,
    path = "/api/promotions/validate-coupon",
    request_body = ValidateCouponRequest,
    responses(
        (status = 200, description = "Validation verdict", body = CouponValidation),
        (status = 400, description = "Malformed request"),
        (status = 404, description = "Unknown coupon code")
    ),
    security(("bearer_auth" = [])),
    tag = "promotions"
)]
pub async fn validate_coupon_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Json(request): Json<ValidateCouponRequest>,
) -> Result<Json<CouponValidation>, PromotionError> {
    request
        .validate()
        .map_err(|e| PromotionError::ValidationError(e.to_string()))?;

    let validation = state
        .promotion_service
        .validate_coupon(
            &request.code,
            user.user_id,
            request.order_amount,
            &request.product_ids,
            &request.category_ids,
        )
        .await?;

    Ok(Json(validation))
}

/// Handler for POST /api/promotions/quote
/// Computes the totals breakdown the checkout would produce for the user's
/// active cart and a discount selection, without writing anything
pub async fn quote_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Json(request): Json<QuoteRequest>,
) -> Result<Json<OrderTotals>, PromotionError> {
    request
        .validate()
        .map_err(|e| PromotionError::ValidationError(e.to_string()))?;

    let lines = load_cart_lines(&state, user.user_id).await?;
    let totals = state
        .promotion_service
        .calculate_order_totals(
            &lines,
            &request.selection,
            user.user_id,
            request.tax_amount,
            request.shipping_amount,
        )
        .await?;

    Ok(Json(totals))
}

/// Handler for GET /api/promotions/applicable
/// Lists promotions that would apply to the user's active cart, with the
/// discount each would produce, and the ones that would not with the reason
pub async fn applicable_discounts_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
) -> Result<Json<ApplicableDiscounts>, PromotionError> {
    let lines = load_cart_lines(&state, user.user_id).await?;
    let discounts = state
        .promotion_service
        .applicable_discounts(&lines, user.user_id)
        .await?;

    Ok(Json(discounts))
}
