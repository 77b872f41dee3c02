use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Cart lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CartStatus {
    /// Open for modification; at most one per user
    Active,
    /// Turned into an order; read-only from here on
    Converted,
    Abandoned,
}

impl CartStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CartStatus::Active => "active",
            CartStatus::Converted => "converted",
            CartStatus::Abandoned => "abandoned",
        }
    }
}

impl std::fmt::Display for CartStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Domain model representing a cart in the database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Cart {
    pub id: Uuid,
    pub user_id: i32,
    pub status: CartStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Domain model representing a line in a cart
///
/// `price` is captured when the item is added and is the original_amount
/// basis the discount engine works from.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CartItem {
    pub id: i32,
    pub cart_id: Uuid,
    pub product_id: i32,
    pub quantity: i32,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Request DTO for adding an item to the cart
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddCartItemRequest {
    pub product_id: i32,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

/// Response DTO for a cart with its items
#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub id: Uuid,
    pub user_id: i32,
    pub status: CartStatus,
    pub items: Vec<CartItem>,
    pub subtotal: Decimal,
}

impl CartResponse {
    pub fn from_parts(cart: Cart, items: Vec<CartItem>) -> Self {
        let subtotal = items
            .iter()
            .map(|item| item.price * Decimal::from(item.quantity))
            .sum();
        Self {
            id: cart.id,
            user_id: cart.user_id,
            status: cart.status,
            items,
            subtotal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(product_id: i32, quantity: i32, price: Decimal) -> CartItem {
        CartItem {
            id: product_id,
            cart_id: Uuid::new_v4(),
            product_id,
            quantity,
            price,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_cart_response_subtotal() {
        let cart = Cart {
            id: Uuid::new_v4(),
            user_id: 1,
            status: CartStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let items = vec![item(1, 2, dec!(4.50)), item(2, 1, dec!(10.00))];

        let response = CartResponse::from_parts(cart, items);
        assert_eq!(response.subtotal, dec!(19.00));
    }

    #[test]
    fn test_cart_response_empty_subtotal() {
        let cart = Cart {
            id: Uuid::new_v4(),
            user_id: 1,
            status: CartStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let response = CartResponse::from_parts(cart, vec![]);
        assert_eq!(response.subtotal, Decimal::ZERO);
    }

    #[test]
    fn test_cart_status_display() {
        assert_eq!(CartStatus::Active.to_string(), "active");
        assert_eq!(CartStatus::Converted.to_string(), "converted");
        assert_eq!(CartStatus::Abandoned.to_string(), "abandoned");
    }
}
