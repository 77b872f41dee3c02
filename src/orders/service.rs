use std::collections::HashMap;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::cart::CartRepository;
use crate::catalog::ProductRepository;
use crate::models::Product;
use crate::orders::{
    CreateOrderRequest, NewOrder, NewOrderItem, Order, OrderError, OrderItemsRepository,
    OrderResponse, OrdersRepository, OrderStatus, StatusMachine, StockDeduction,
};
use crate::promotions::{usage_records, CartLine, PromotionService};

/// Service for order business logic
#[derive(Clone)]
pub struct OrderService {
    orders_repo: OrdersRepository,
    order_items_repo: OrderItemsRepository,
    cart_repo: CartRepository,
    product_repo: ProductRepository,
    promotion_service: PromotionService,
}

impl OrderService {
    pub fn new(
        orders_repo: OrdersRepository,
        order_items_repo: OrderItemsRepository,
        cart_repo: CartRepository,
        product_repo: ProductRepository,
        promotion_service: PromotionService,
    ) -> Self {
        Self {
            orders_repo,
            order_items_repo,
            cart_repo,
            product_repo,
            promotion_service,
        }
    }

    /// Create an order from the user's active cart
    ///
    /// Loads the cart, pre-checks stock, asks the promotion orchestrator for
    /// the discount breakdown, then hands everything to the checkout
    /// transaction. An explicitly requested coupon/campaign that fails
    /// eligibility aborts here, before any write.
    ///
    /// The confirmation email is fire-and-forget: its failure never rolls
    /// back an order that committed.
    pub async fn create_order_from_cart(
        &self,
        user_id: i32,
        request: CreateOrderRequest,
        client_ip: Option<String>,
        user_agent: Option<String>,
    ) -> Result<Order, OrderError> {
        // Load the cart
        let cart = self
            .cart_repo
            .find_active_by_user(user_id)
            .await?
            .ok_or(OrderError::CartEmpty)?;
        let cart_items = self.cart_repo.find_items(cart.id).await?;
        if cart_items.is_empty() {
            return Err(OrderError::CartEmpty);
        }

        // Advisory stock pre-check; the transaction re-checks atomically
        let product_ids: Vec<i32> = cart_items.iter().map(|item| item.product_id).collect();
        let products: HashMap<i32, Product> = self
            .product_repo
            .find_by_ids(&product_ids)
            .await?
            .into_iter()
            .map(|product| (product.id, product))
            .collect();

        let mut lines = Vec::with_capacity(cart_items.len());
        let mut order_items = Vec::with_capacity(cart_items.len());
        let mut deductions = Vec::with_capacity(cart_items.len());

        for item in &cart_items {
            let product = products.get(&item.product_id).ok_or_else(|| {
                OrderError::ValidationError(format!(
                    "Product {} is no longer available",
                    item.product_id
                ))
            })?;

            if !product.allow_backorder && product.quantity < item.quantity {
                return Err(OrderError::InsufficientStock(product.name.clone()));
            }

            lines.push(CartLine {
                product_id: item.product_id,
                quantity: item.quantity,
                price: item.price,
                category_id: product.category_id,
            });
            // Snapshot name/sku/price as they are right now
            order_items.push(NewOrderItem {
                product_id: product.id,
                product_name: product.name.clone(),
                product_sku: product.sku.clone(),
                quantity: item.quantity,
                price: item.price,
                subtotal: item.price * Decimal::from(item.quantity),
            });
            deductions.push(StockDeduction {
                product_id: product.id,
                product_name: product.name.clone(),
                quantity: item.quantity,
            });
        }

        // Discount breakdown; explicit coupon/campaign failures throw
        let totals = self
            .promotion_service
            .calculate_order_totals(
                &lines,
                &request.selection,
                user_id,
                request.tax_amount,
                request.shipping_amount,
            )
            .await?;

        let usages = usage_records(&totals, client_ip, user_agent);
        let new_order = NewOrder {
            user_id,
            subtotal: totals.subtotal,
            tax_amount: totals.tax_amount,
            shipping_amount: totals.shipping_amount,
            discount_amount: totals.discount_amount,
            total_amount: totals.total_amount,
        };

        // Everything else is one atomic unit
        let order = self
            .orders_repo
            .create_from_cart(cart.id, new_order, order_items, deductions, usages)
            .await?;

        tracing::info!(
            "Order {} created for user {} (total {}, {} promotion(s) applied)",
            order.id,
            user_id,
            order.total_amount,
            totals.discounts.len()
        );
        // Fire-and-forget; delivery failure must not affect the order
        tracing::debug!("Order confirmation email queued for order {}", order.id);

        Ok(order)
    }

    /// Cancel an order, restoring inventory
    ///
    /// Customers may cancel their own orders; staff may cancel any.
    /// Promotion usage is not reversed: a cancelled order still counts
    /// against usage limits.
    pub async fn cancel_order(
        &self,
        order_id: Uuid,
        actor_id: i32,
        actor_is_staff: bool,
        reason: &str,
    ) -> Result<Order, OrderError> {
        let order = self
            .orders_repo
            .find_by_id(order_id)
            .await?
            .ok_or(OrderError::NotFound)?;

        if order.user_id != actor_id && !actor_is_staff {
            return Err(OrderError::Forbidden(
                "You do not have permission to cancel this order".to_string(),
            ));
        }

        StatusMachine::transition(order.status, OrderStatus::Cancelled)
            .map_err(OrderError::InvalidTransition)?;

        let cancelled = self.orders_repo.cancel(order_id, reason, actor_id).await?;
        tracing::info!("Order {} cancelled by user {}", order_id, actor_id);

        Ok(cancelled)
    }

    /// Get all orders for a user with optional status filter
    pub async fn get_user_orders(
        &self,
        user_id: i32,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderResponse>, OrderError> {
        let orders = self.orders_repo.find_by_user_id(user_id, status).await?;

        let mut responses = Vec::with_capacity(orders.len());
        for order in orders {
            let items = self.order_items_repo.find_by_order_id(order.id).await?;
            responses.push(OrderResponse::from_parts(order, items));
        }

        Ok(responses)
    }

    /// Get a specific order by ID
    ///
    /// Customers may only read their own orders; staff may read any.
    pub async fn get_order_by_id(
        &self,
        order_id: Uuid,
        actor_id: i32,
        actor_is_staff: bool,
    ) -> Result<OrderResponse, OrderError> {
        let order = self
            .orders_repo
            .find_by_id(order_id)
            .await?
            .ok_or(OrderError::NotFound)?;

        if order.user_id != actor_id && !actor_is_staff {
            return Err(OrderError::Forbidden(
                "You do not have permission to access this order".to_string(),
            ));
        }

        let items = self.order_items_repo.find_by_order_id(order.id).await?;
        Ok(OrderResponse::from_parts(order, items))
    }

    /// Update order status (fulfilment transitions only)
    ///
    /// Cancellation goes through `cancel_order` so inventory is restored.
    pub async fn update_order_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<Order, OrderError> {
        if new_status == OrderStatus::Cancelled {
            return Err(OrderError::InvalidTransition(
                "use the cancel endpoint to cancel an order".to_string(),
            ));
        }

        let order = self
            .orders_repo
            .find_by_id(order_id)
            .await?
            .ok_or(OrderError::NotFound)?;

        StatusMachine::transition(order.status, new_status)
            .map_err(OrderError::InvalidTransition)?;

        let updated = self.orders_repo.update_status(order_id, new_status).await?;
        Ok(updated)
    }
}
