// HTTP handlers for order endpoints

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthenticatedUser;
use crate::orders::{
    CancelOrderRequest, CreateOrderRequest, OrderError, OrderResponse, OrderStatus,
    UpdateOrderStatusRequest,
};

/// Query parameters for order history
#[derive(Debug, Deserialize)]
pub struct OrderHistoryQuery {
    /// Optional status filter
    pub status: Option<OrderStatus>,
}

fn client_meta(headers: &HeaderMap) -> (Option<String>, Option<String>) {
    let ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string());
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    (ip, user_agent)
}

/// Handler for POST /api/orders
/// Creates an order from the authenticated user's active cart
#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = OrderResponse),
        (status = 400, description = "Empty cart, insufficient stock or ineligible promotion"),
        (status = 409, description = "Promotion usage limit reached at commit time")
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn create_order_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    headers: HeaderMap,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), OrderError> {
    request
        .validate()
        .map_err(|e| OrderError::ValidationError(e.to_string()))?;

    let (client_ip, user_agent) = client_meta(&headers);
    let order = state
        .order_service
        .create_order_from_cart(user.user_id, request, client_ip, user_agent)
        .await?;

    let items = state.order_items_repo.find_by_order_id(order.id).await?;
    Ok((
        StatusCode::CREATED,
        Json(OrderResponse::from_parts(order, items)),
    ))
}

/// Handler for GET /api/orders
/// Retrieves order history for the authenticated user
pub async fn get_order_history_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Query(query): Query<OrderHistoryQuery>,
) -> Result<Json<Vec<OrderResponse>>, OrderError> {
    let orders = state
        .order_service
        .get_user_orders(user.user_id, query.status)
        .await?;

    Ok(Json(orders))
}

/// Handler for GET /api/orders/{order_id}
/// Retrieves a specific order by ID
pub async fn get_order_by_id_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, OrderError> {
    let order = state
        .order_service
        .get_order_by_id(order_id, user.user_id, user.is_staff())
        .await?;

    Ok(Json(order))
}

/// Handler for POST /api/orders/{order_id}/cancel
/// Cancels an order, restoring inventory
pub async fn cancel_order_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(order_id): Path<Uuid>,
    Json(request): Json<CancelOrderRequest>,
) -> Result<Json<OrderResponse>, OrderError> {
    request
        .validate()
        .map_err(|e| OrderError::ValidationError(e.to_string()))?;

    let order = state
        .order_service
        .cancel_order(order_id, user.user_id, user.is_staff(), &request.reason)
        .await?;

    let items = state.order_items_repo.find_by_order_id(order.id).await?;
    Ok(Json(OrderResponse::from_parts(order, items)))
}

/// Handler for PATCH /api/orders/{order_id}/status
/// Updates the fulfilment status of an order (staff only)
pub async fn update_order_status_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(order_id): Path<Uuid>,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> Result<Json<OrderResponse>, OrderError> {
    if !user.is_staff() {
        return Err(OrderError::Forbidden(
            "Only staff may update order status".to_string(),
        ));
    }

    request
        .validate()
        .map_err(|e| OrderError::ValidationError(e.to_string()))?;

    let order = state
        .order_service
        .update_order_status(order_id, request.status)
        .await?;

    let items = state.order_items_repo.find_by_order_id(order.id).await?;
    Ok(Json(OrderResponse::from_parts(order, items)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_meta_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
        headers.insert(header::USER_AGENT, "storefront-web/2.1".parse().unwrap());

        let (ip, agent) = client_meta(&headers);
        assert_eq!(ip.as_deref(), Some("203.0.113.9"));
        assert_eq!(agent.as_deref(), Some("storefront-web/2.1"));
    }

    #[test]
    fn test_client_meta_absent_headers() {
        let headers = HeaderMap::new();
        let (ip, agent) = client_meta(&headers);
        assert!(ip.is_none());
        assert!(agent.is_none());
    }
}
