use sqlx::PgPool;
use uuid::Uuid;

use crate::cart::CartRepository;
use crate::catalog::{ProductRepository, StockMovementType};
use crate::orders::{NewOrder, NewOrderItem, Order, OrderError, OrderItem, OrderStatus, StockDeduction};
use crate::promotions::{DiscountCalculator, NewUsageRecord, PromotionRepository};

const ORDER_COLUMNS: &str = "id, user_id, status, subtotal, tax_amount, shipping_amount, \
     discount_amount, total_amount, cancel_reason, cancelled_by, created_at, updated_at";

/// Repository for order operations, including the checkout transaction
#[derive(Clone)]
pub struct OrdersRepository {
    pool: PgPool,
}

impl OrdersRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Execute the full checkout as one all-or-nothing transaction
    ///
    /// In order: insert the order, insert its items, deduct stock (atomic
    /// conditional updates) with audit movements, append usage ledger rows
    /// with the authoritative limit re-checks, convert the cart, commit.
    /// Any failure rolls everything back: no partial order, no partial
    /// stock deduction, no orphaned usage record.
    ///
    /// Monetary amounts are rounded to 2 decimal places here, at the
    /// persistence boundary.
    pub async fn create_from_cart(
        &self,
        cart_id: Uuid,
        new_order: NewOrder,
        items: Vec<NewOrderItem>,
        deductions: Vec<StockDeduction>,
        usages: Vec<NewUsageRecord>,
    ) -> Result<Order, OrderError> {
        let mut tx = self.pool.begin().await?;

        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            INSERT INTO orders
                (user_id, status, subtotal, tax_amount, shipping_amount,
                 discount_amount, total_amount)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(new_order.user_id)
        .bind(OrderStatus::Pending)
        .bind(DiscountCalculator::round_money(new_order.subtotal))
        .bind(DiscountCalculator::round_money(new_order.tax_amount))
        .bind(DiscountCalculator::round_money(new_order.shipping_amount))
        .bind(DiscountCalculator::round_money(new_order.discount_amount))
        .bind(DiscountCalculator::round_money(new_order.total_amount))
        .fetch_one(&mut *tx)
        .await?;

        for item in &items {
            sqlx::query(
                r#"
                INSERT INTO order_items
                    (order_id, product_id, product_name, product_sku,
                     quantity, price, subtotal)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(order.id)
            .bind(item.product_id)
            .bind(&item.product_name)
            .bind(&item.product_sku)
            .bind(item.quantity)
            .bind(DiscountCalculator::round_money(item.price))
            .bind(DiscountCalculator::round_money(item.subtotal))
            .execute(&mut *tx)
            .await?;
        }

        // Stock: the conditional update is the authoritative check; the
        // service's earlier read was advisory only
        for deduction in &deductions {
            let level =
                ProductRepository::deduct_stock(&mut *tx, deduction.product_id, deduction.quantity)
                    .await?
                    .ok_or_else(|| {
                        OrderError::InsufficientStock(deduction.product_name.clone())
                    })?;

            ProductRepository::record_movement(
                &mut *tx,
                deduction.product_id,
                StockMovementType::Sale,
                -deduction.quantity,
                level,
                Some(order.id),
                None,
            )
            .await?;
        }

        // Usage ledger: re-check limits inside the transaction, then append
        // the row and bump the cached counter together
        for usage in &usages {
            if let Some(limit) = PromotionRepository::per_customer_limit_tx(
                &mut *tx,
                usage.promotion_kind,
                usage.promotion_id,
            )
            .await?
            {
                let used = PromotionRepository::count_user_usages_tx(
                    &mut *tx,
                    usage.promotion_kind,
                    usage.promotion_id,
                    new_order.user_id,
                )
                .await?;
                if used >= i64::from(limit) {
                    return Err(OrderError::UsageLimitExceeded(format!(
                        "{} {}",
                        usage.promotion_kind, usage.promotion_id
                    )));
                }
            }

            PromotionRepository::record_usage(&mut *tx, usage, new_order.user_id, order.id).await?;

            let bumped = PromotionRepository::increment_usage_count(
                &mut *tx,
                usage.promotion_kind,
                usage.promotion_id,
            )
            .await?;
            if !bumped {
                return Err(OrderError::UsageLimitExceeded(format!(
                    "{} {}",
                    usage.promotion_kind, usage.promotion_id
                )));
            }
        }

        let converted = CartRepository::mark_converted(&mut *tx, cart_id).await?;
        if !converted {
            return Err(OrderError::CartAlreadyConverted);
        }

        tx.commit().await?;

        Ok(order)
    }

    /// Cancel an order, restoring inventory with inverse stock movements
    ///
    /// The status guard re-checks cancellability inside the transaction so
    /// a racing fulfilment transition cannot be undone. Promotion usage is
    /// deliberately left untouched: a cancelled order still counts against
    /// usage limits.
    pub async fn cancel(
        &self,
        order_id: Uuid,
        reason: &str,
        actor_id: i32,
    ) -> Result<Order, OrderError> {
        let mut tx = self.pool.begin().await?;

        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE orders
            SET status = $2, cancel_reason = $3, cancelled_by = $4, updated_at = NOW()
            WHERE id = $1 AND status IN ('pending', 'confirmed')
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .bind(OrderStatus::Cancelled)
        .bind(reason)
        .bind(actor_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            OrderError::InvalidTransition("order can no longer be cancelled".to_string())
        })?;

        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT id, order_id, product_id, product_name, product_sku,
                   quantity, price, subtotal
            FROM order_items
            WHERE order_id = $1
            "#,
        )
        .bind(order_id)
        .fetch_all(&mut *tx)
        .await?;

        for item in &items {
            let level =
                ProductRepository::restore_stock(&mut *tx, item.product_id, item.quantity)
                    .await?
                    .ok_or_else(|| {
                        OrderError::DatabaseError(format!(
                            "product {} missing during cancellation",
                            item.product_id
                        ))
                    })?;

            ProductRepository::record_movement(
                &mut *tx,
                item.product_id,
                StockMovementType::Return,
                item.quantity,
                level,
                Some(order_id),
                Some("order cancelled"),
            )
            .await?;
        }

        tx.commit().await?;

        Ok(order)
    }

    /// Find an order by ID
    pub async fn find_by_id(&self, order_id: Uuid) -> Result<Option<Order>, OrderError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {} FROM orders WHERE id = $1",
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// Find orders by user ID with optional status filter
    pub async fn find_by_user_id(
        &self,
        user_id: i32,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, OrderError> {
        let orders = match status {
            Some(status_filter) => {
                sqlx::query_as::<_, Order>(&format!(
                    "SELECT {} FROM orders WHERE user_id = $1 AND status = $2 \
                     ORDER BY created_at DESC",
                    ORDER_COLUMNS
                ))
                .bind(user_id)
                .bind(status_filter)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Order>(&format!(
                    "SELECT {} FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
                    ORDER_COLUMNS
                ))
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(orders)
    }

    /// Update order status
    pub async fn update_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<Order, OrderError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE orders
            SET status = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(new_status)
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(OrderError::NotFound)?;

        Ok(order)
    }
}

/// Repository for order items operations
#[derive(Clone)]
pub struct OrderItemsRepository {
    pool: PgPool,
}

impl OrderItemsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find all items for a given order
    pub async fn find_by_order_id(&self, order_id: Uuid) -> Result<Vec<OrderItem>, OrderError> {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT id, order_id, product_id, product_name, product_sku,
                   quantity, price, subtotal
            FROM order_items
            WHERE order_id = $1
            ORDER BY id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    // The checkout and cancellation transactions require a live database
    // and are covered by the integration suite (testcontainers), including
    // the oversell race: two concurrent checkouts against quantity = 1 must
    // end with exactly one created order and one insufficient-stock failure.
}
