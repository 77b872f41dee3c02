use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::validation::validate_positive_amount;

/// Represents a sellable product in the catalog
///
/// The promotion engine consumes price/sale_price/quantity/allow_backorder;
/// the rest is storefront metadata.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Product {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "Single-Origin Beans 1kg")]
    pub name: String,
    #[schema(example = "SKU-BEANS-1KG")]
    pub sku: String,
    pub description: String,
    #[schema(value_type = f64, example = 24.90)]
    pub price: Decimal,
    /// Promotional list price; when set, carts capture this instead of price
    #[schema(value_type = Option<f64>, example = 19.90)]
    pub sale_price: Option<Decimal>,
    /// Units on hand
    #[schema(example = 120)]
    pub quantity: i32,
    /// When true, orders may drive quantity below zero
    pub allow_backorder: bool,
    pub category_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// The price a cart captures at add time: sale price when one is set
    pub fn effective_price(&self) -> Decimal {
        self.sale_price.unwrap_or(self.price)
    }
}

/// Request payload for creating a product
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateProduct {
    #[validate(length(min = 1, message = "Name must not be empty"))]
    #[schema(example = "Single-Origin Beans 1kg")]
    pub name: String,
    #[validate(length(min = 1, message = "SKU must not be empty"))]
    #[schema(example = "SKU-BEANS-1KG")]
    pub sku: String,
    #[serde(default)]
    pub description: String,
    #[validate(custom = "validate_positive_amount")]
    #[schema(value_type = f64, example = 24.90)]
    pub price: Decimal,
    #[schema(value_type = Option<f64>)]
    pub sale_price: Option<Decimal>,
    #[validate(range(min = 0, message = "Quantity must not be negative"))]
    #[serde(default)]
    pub quantity: i32,
    #[serde(default)]
    pub allow_backorder: bool,
    pub category_id: Option<i32>,
}

/// Request payload for updating a product
///
/// All fields are optional to support partial updates; each present field
/// maps to exactly one column.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub description: Option<String>,
    #[validate(custom = "validate_positive_amount")]
    #[schema(value_type = Option<f64>)]
    pub price: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub sale_price: Option<Decimal>,
    pub quantity: Option<i32>,
    pub allow_backorder: Option<bool>,
    pub category_id: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_effective_price_prefers_sale_price() {
        let product = Product {
            id: 1,
            name: "Beans".to_string(),
            sku: "SKU-1".to_string(),
            description: String::new(),
            price: dec!(24.90),
            sale_price: Some(dec!(19.90)),
            quantity: 10,
            allow_backorder: false,
            category_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(product.effective_price(), dec!(19.90));
    }

    #[test]
    fn test_effective_price_falls_back_to_price() {
        let product = Product {
            id: 1,
            name: "Beans".to_string(),
            sku: "SKU-1".to_string(),
            description: String::new(),
            price: dec!(24.90),
            sale_price: None,
            quantity: 10,
            allow_backorder: false,
            category_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(product.effective_price(), dec!(24.90));
    }

    #[test]
    fn test_create_product_deserialization_defaults() {
        let json = r#"{
            "name": "Beans",
            "sku": "SKU-1",
            "price": "24.90"
        }"#;

        let create: CreateProduct =
            serde_json::from_str(json).expect("Failed to deserialize CreateProduct");

        assert_eq!(create.name, "Beans");
        assert_eq!(create.quantity, 0);
        assert!(!create.allow_backorder);
        assert_eq!(create.description, "");
    }

    #[test]
    fn test_update_product_partial_fields() {
        let json = r#"{ "price": "19.90" }"#;

        let update: UpdateProduct =
            serde_json::from_str(json).expect("Failed to deserialize UpdateProduct");

        assert_eq!(update.price, Some(dec!(19.90)));
        assert_eq!(update.name, None);
        assert_eq!(update.quantity, None);
    }
}
