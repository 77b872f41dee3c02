use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::promotions::DiscountSelection;
use crate::validation::validate_non_negative_amount;

/// Order status enum representing the lifecycle of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            _ => Err(format!("Invalid order status: {}", s)),
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Domain model representing an order in the database
///
/// total_amount = subtotal + tax_amount + shipping_amount - discount_amount,
/// floored at zero.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub user_id: i32,
    pub status: OrderStatus,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub shipping_amount: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
    pub cancel_reason: Option<String>,
    pub cancelled_by: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Domain model representing an item within an order
///
/// product_name/product_sku/price are snapshots taken at purchase time and
/// stay fixed even when the product row later changes.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OrderItem {
    pub id: i32,
    pub order_id: Uuid,
    pub product_id: i32,
    pub product_name: String,
    pub product_sku: String,
    pub quantity: i32,
    pub price: Decimal,
    pub subtotal: Decimal,
}

/// Order row prepared by the service, inserted by the checkout transaction
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: i32,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub shipping_amount: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
}

/// Order item row prepared by the service
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: i32,
    pub product_name: String,
    pub product_sku: String,
    pub quantity: i32,
    pub price: Decimal,
    pub subtotal: Decimal,
}

/// One stock deduction the checkout transaction must apply
#[derive(Debug, Clone)]
pub struct StockDeduction {
    pub product_id: i32,
    /// For the insufficient-stock error message
    pub product_name: String,
    pub quantity: i32,
}

/// Request DTO for creating an order from the active cart
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    /// Promotions the customer chose at checkout
    #[serde(flatten)]
    pub selection: DiscountSelection,
    #[validate(custom = "validate_non_negative_amount")]
    #[serde(default)]
    #[schema(value_type = f64)]
    pub tax_amount: Decimal,
    #[validate(custom = "validate_non_negative_amount")]
    #[serde(default)]
    #[schema(value_type = f64)]
    pub shipping_amount: Decimal,
}

/// Request DTO for cancelling an order
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CancelOrderRequest {
    #[validate(length(min = 1, message = "Cancellation reason must not be empty"))]
    pub reason: String,
}

/// Request DTO for updating order status
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

/// Response DTO for order with items
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub user_id: i32,
    pub status: OrderStatus,
    #[schema(value_type = f64)]
    pub subtotal: Decimal,
    #[schema(value_type = f64)]
    pub tax_amount: Decimal,
    #[schema(value_type = f64)]
    pub shipping_amount: Decimal,
    #[schema(value_type = f64)]
    pub discount_amount: Decimal,
    #[schema(value_type = f64)]
    pub total_amount: Decimal,
    pub items: Vec<OrderItemResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderResponse {
    pub fn from_parts(order: Order, items: Vec<OrderItem>) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            status: order.status,
            subtotal: order.subtotal,
            tax_amount: order.tax_amount,
            shipping_amount: order.shipping_amount,
            discount_amount: order.discount_amount,
            total_amount: order.total_amount,
            items: items.into_iter().map(|item| item.into()).collect(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

/// Response DTO for order item
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: i32,
    pub product_id: i32,
    pub product_name: String,
    pub product_sku: String,
    pub quantity: i32,
    #[schema(value_type = f64)]
    pub price: Decimal,
    #[schema(value_type = f64)]
    pub subtotal: Decimal,
}

impl From<OrderItem> for OrderItemResponse {
    fn from(item: OrderItem) -> Self {
        Self {
            id: item.id,
            product_id: item.product_id,
            product_name: item.product_name,
            product_sku: item.product_sku,
            quantity: item.quantity,
            price: item.price,
            subtotal: item.subtotal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_round_trip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::from_str(status.as_str()), Ok(status));
        }
        assert!(OrderStatus::from_str("unknown").is_err());
    }

    #[test]
    fn test_create_order_request_defaults() {
        let json = r#"{ "coupon_code": "SAVE20" }"#;
        let request: CreateOrderRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.selection.coupon_code.as_deref(), Some("SAVE20"));
        assert_eq!(request.tax_amount, Decimal::ZERO);
        assert_eq!(request.shipping_amount, Decimal::ZERO);
        assert!(request.selection.bogo_offers.is_empty());
    }

    #[test]
    fn test_create_order_request_with_bogo() {
        let json = r#"{
            "campaign_id": 3,
            "bogo_offers": [{"bogo_id": 1, "buy_product_id": 2, "buy_quantity": 2, "get_product_id": 5}],
            "shipping_amount": "7.50"
        }"#;
        let request: CreateOrderRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.selection.campaign_id, Some(3));
        assert_eq!(request.selection.bogo_offers[0].get_product_id, 5);
        assert_eq!(request.shipping_amount.to_string(), "7.50");
    }
}
