use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::catalog::{StockLevel, StockMovementType};
use crate::models::Product;

/// Repository for product and inventory operations
#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a product by ID
    pub async fn find_by_id(&self, id: i32) -> Result<Option<Product>, sqlx::Error> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, sku, description, price, sale_price, quantity,
                   allow_backorder, category_id, created_at, updated_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Find multiple products by IDs
    pub async fn find_by_ids(&self, ids: &[i32]) -> Result<Vec<Product>, sqlx::Error> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, sku, description, price, sale_price, quantity,
                   allow_backorder, category_id, created_at, updated_at
            FROM products
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Atomically deduct stock inside an open transaction
    ///
    /// The WHERE clause makes the check-and-decrement a single statement, so
    /// two concurrent orders cannot both pass a stock check and oversell.
    /// Returns `None` when the product is missing or has insufficient stock
    /// (and does not allow backorder); the caller must then roll back.
    pub async fn deduct_stock(
        conn: &mut PgConnection,
        product_id: i32,
        quantity: i32,
    ) -> Result<Option<StockLevel>, sqlx::Error> {
        let level = sqlx::query_as::<_, StockLevel>(
            r#"
            UPDATE products
            SET quantity = quantity - $2, updated_at = NOW()
            WHERE id = $1 AND (allow_backorder OR quantity >= $2)
            RETURNING quantity + $2 AS quantity_before, quantity AS quantity_after
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .fetch_optional(conn)
        .await?;

        Ok(level)
    }

    /// Restore stock inside an open transaction (order cancellation)
    pub async fn restore_stock(
        conn: &mut PgConnection,
        product_id: i32,
        quantity: i32,
    ) -> Result<Option<StockLevel>, sqlx::Error> {
        let level = sqlx::query_as::<_, StockLevel>(
            r#"
            UPDATE products
            SET quantity = quantity + $2, updated_at = NOW()
            WHERE id = $1
            RETURNING quantity - $2 AS quantity_before, quantity AS quantity_after
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .fetch_optional(conn)
        .await?;

        Ok(level)
    }

    /// Append a stock movement audit row inside an open transaction
    pub async fn record_movement(
        conn: &mut PgConnection,
        product_id: i32,
        movement_type: StockMovementType,
        quantity_change: i32,
        level: StockLevel,
        reference_id: Option<Uuid>,
        note: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO stock_movements
                (product_id, movement_type, quantity_change, quantity_before,
                 quantity_after, reference_id, note)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(product_id)
        .bind(movement_type)
        .bind(quantity_change)
        .bind(level.quantity_before)
        .bind(level.quantity_after)
        .bind(reference_id)
        .bind(note)
        .execute(conn)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    // The atomic deduct/restore statements are exercised through the order
    // service integration suite (testcontainers); there is no meaningful way
    // to unit-test single-statement SQL without a database.
}
