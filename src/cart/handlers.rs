// HTTP handlers for cart endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::auth::AuthenticatedUser;
use crate::cart::{AddCartItemRequest, CartError, CartResponse};

/// Handler for GET /api/cart
/// Returns the authenticated user's active cart (creating one when missing)
pub async fn get_cart_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
) -> Result<Json<CartResponse>, CartError> {
    let cart = state.cart_repo.get_or_create_active(user.user_id).await?;
    let items = state.cart_repo.find_items(cart.id).await?;

    Ok(Json(CartResponse::from_parts(cart, items)))
}

/// Handler for POST /api/cart/items
/// Adds a product to the authenticated user's active cart
pub async fn add_cart_item_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Json(request): Json<AddCartItemRequest>,
) -> Result<(StatusCode, Json<CartResponse>), CartError> {
    request
        .validate()
        .map_err(|e| CartError::ValidationError(e.to_string()))?;

    // Capture the current effective price; it stays with the cart line even
    // if the product price changes later
    let product = state
        .product_repo
        .find_by_id(request.product_id)
        .await?
        .ok_or(CartError::ProductNotFound(request.product_id))?;

    let cart = state.cart_repo.get_or_create_active(user.user_id).await?;
    state
        .cart_repo
        .add_item(
            cart.id,
            product.id,
            request.quantity,
            product.effective_price(),
        )
        .await?;

    let items = state.cart_repo.find_items(cart.id).await?;
    tracing::debug!(
        "User {} added product {} x{} to cart {}",
        user.user_id,
        product.id,
        request.quantity,
        cart.id
    );

    Ok((StatusCode::CREATED, Json(CartResponse::from_parts(cart, items))))
}

/// Handler for DELETE /api/cart/items/{product_id}
/// Removes a product from the authenticated user's active cart
pub async fn remove_cart_item_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(product_id): Path<i32>,
) -> Result<Json<CartResponse>, CartError> {
    let cart = state
        .cart_repo
        .find_active_by_user(user.user_id)
        .await?
        .ok_or(CartError::NotFound)?;

    state.cart_repo.remove_item(cart.id, product_id).await?;
    let items = state.cart_repo.find_items(cart.id).await?;

    Ok(Json(CartResponse::from_parts(cart, items)))
}
