use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Cause of an inventory quantity change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StockMovementType {
    /// Deducted by order placement
    Sale,
    /// Restored by order cancellation
    Return,
    /// Manual correction
    Adjustment,
}

impl StockMovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockMovementType::Sale => "sale",
            StockMovementType::Return => "return",
            StockMovementType::Adjustment => "adjustment",
        }
    }
}

impl std::fmt::Display for StockMovementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Audit row recording a single inventory quantity change
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StockMovement {
    pub id: i64,
    pub product_id: i32,
    pub movement_type: StockMovementType,
    pub quantity_change: i32,
    pub quantity_before: i32,
    pub quantity_after: i32,
    /// Order id for sale/return movements
    pub reference_id: Option<Uuid>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Before/after quantities returned by an atomic stock mutation
#[derive(Debug, Clone, Copy, FromRow)]
pub struct StockLevel {
    pub quantity_before: i32,
    pub quantity_after: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movement_type_display() {
        assert_eq!(StockMovementType::Sale.to_string(), "sale");
        assert_eq!(StockMovementType::Return.to_string(), "return");
        assert_eq!(StockMovementType::Adjustment.to_string(), "adjustment");
    }

    #[test]
    fn test_movement_type_serialization() {
        let json = serde_json::to_string(&StockMovementType::Sale).unwrap();
        assert_eq!(json, "\"sale\"");
        let parsed: StockMovementType = serde_json::from_str("\"return\"").unwrap();
        assert_eq!(parsed, StockMovementType::Return);
    }
}
