use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::cart::{Cart, CartError, CartItem, CartStatus};

/// Repository for cart operations
#[derive(Clone)]
pub struct CartRepository {
    pool: PgPool,
}

impl CartRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find the user's active cart, if any
    pub async fn find_active_by_user(&self, user_id: i32) -> Result<Option<Cart>, CartError> {
        let cart = sqlx::query_as::<_, Cart>(
            r#"
            SELECT id, user_id, status, created_at, updated_at
            FROM carts
            WHERE user_id = $1 AND status = 'active'
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(cart)
    }

    /// Find the user's active cart, creating one when none exists
    ///
    /// The partial unique index on (user_id) WHERE status = 'active' makes
    /// the insert race-safe; ON CONFLICT falls through to the existing row.
    pub async fn get_or_create_active(&self, user_id: i32) -> Result<Cart, CartError> {
        if let Some(cart) = self.find_active_by_user(user_id).await? {
            return Ok(cart);
        }

        let cart = sqlx::query_as::<_, Cart>(
            r#"
            INSERT INTO carts (user_id, status)
            VALUES ($1, 'active')
            ON CONFLICT (user_id) WHERE status = 'active' DO UPDATE
                SET updated_at = NOW()
            RETURNING id, user_id, status, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(cart)
    }

    /// Find all items for a given cart
    pub async fn find_items(&self, cart_id: Uuid) -> Result<Vec<CartItem>, CartError> {
        let items = sqlx::query_as::<_, CartItem>(
            r#"
            SELECT id, cart_id, product_id, quantity, price, created_at
            FROM cart_items
            WHERE cart_id = $1
            ORDER BY id
            "#,
        )
        .bind(cart_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Add a product to the cart, capturing its price at add time
    ///
    /// Re-adding the same product accumulates quantity; the captured price
    /// stays the one from the first add.
    pub async fn add_item(
        &self,
        cart_id: Uuid,
        product_id: i32,
        quantity: i32,
        price: rust_decimal::Decimal,
    ) -> Result<CartItem, CartError> {
        let item = sqlx::query_as::<_, CartItem>(
            r#"
            INSERT INTO cart_items (cart_id, product_id, quantity, price)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (cart_id, product_id) DO UPDATE
                SET quantity = cart_items.quantity + EXCLUDED.quantity
            RETURNING id, cart_id, product_id, quantity, price, created_at
            "#,
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity)
        .bind(price)
        .fetch_one(&self.pool)
        .await?;

        Ok(item)
    }

    /// Remove a product from the cart
    pub async fn remove_item(&self, cart_id: Uuid, product_id: i32) -> Result<bool, CartError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND product_id = $2")
            .bind(cart_id)
            .bind(product_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Mark a cart as converted inside an open checkout transaction
    ///
    /// Guards on status = 'active' so a cart cannot be converted twice by
    /// two racing checkouts. Returns false when the guard did not match.
    pub async fn mark_converted(
        conn: &mut PgConnection,
        cart_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE carts
            SET status = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'active'
            "#,
        )
        .bind(cart_id)
        .bind(CartStatus::Converted)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
