pub mod auth;
pub mod cart;
pub mod catalog;
pub mod db;
pub mod error;
pub mod models;
pub mod orders;
pub mod promotions;
pub mod validation;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, patch, post, put},
    Router,
};
use sqlx::PgPool;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;
use validator::Validate;

use auth::AuthenticatedUser;
use cart::CartRepository;
use catalog::ProductRepository;
use error::ApiError;
use models::{CreateProduct, Product, UpdateProduct};
use orders::{OrderItemsRepository, OrderService, OrdersRepository};
use promotions::{PromotionRepository, PromotionService};

/// Registers the bearer scheme the protected endpoints reference
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        create_product,
        get_all_products,
        get_product_by_id,
        update_product,
        promotions::handlers::validate_coupon_handler,
        orders::handlers::create_order_handler,
    ),
    components(
        schemas(
            Product,
            CreateProduct,
            UpdateProduct,
            promotions::ValidateCouponRequest,
            promotions::CouponValidation,
            promotions::DiscountSelection,
            promotions::BogoApplication,
            promotions::AppliedDiscount,
            promotions::IneligiblePromotion,
            promotions::OrderTotals,
            orders::CreateOrderRequest,
            orders::OrderResponse,
            orders::OrderItemResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "products", description = "Product catalog endpoints"),
        (name = "promotions", description = "Coupon validation and discount quoting"),
        (name = "orders", description = "Checkout and order management")
    ),
    info(
        title = "Storefront API",
        version = "1.0.0",
        description = "E-commerce backend with a promotion engine: campaigns, coupons and BOGO offers"
    )
)]
struct ApiDoc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub product_repo: ProductRepository,
    pub cart_repo: CartRepository,
    pub order_items_repo: OrderItemsRepository,
    pub promotion_service: PromotionService,
    pub order_service: OrderService,
}

const PRODUCT_COLUMNS: &str = "id, name, sku, description, price, sale_price, quantity, \
     allow_backorder, category_id, created_at, updated_at";

/// Handler for POST /api/products
/// Creates a new product (staff only)
#[utoipa::path(
    post,
    path = "/api/products",
    request_body = CreateProduct,
    responses(
        (status = 201, description = "Product created successfully", body = Product),
        (status = 400, description = "Invalid input data"),
        (status = 409, description = "Duplicate SKU")
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
async fn create_product(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateProduct>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    if !user.is_staff() {
        return Err(ApiError::Forbidden(
            "Only staff may manage products".to_string(),
        ));
    }

    tracing::debug!("Creating new product: {}", payload.name);
    payload.validate()?;

    if db::check_duplicate_sku(&state.db, &payload.sku).await? {
        tracing::warn!("Attempt to create duplicate SKU: {}", payload.sku);
        return Err(ApiError::Conflict {
            message: format!("Product with SKU '{}' already exists", payload.sku),
        });
    }

    let product = sqlx::query_as::<_, Product>(&format!(
        r#"
        INSERT INTO products
            (name, sku, description, price, sale_price, quantity,
             allow_backorder, category_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {}
        "#,
        PRODUCT_COLUMNS
    ))
    .bind(&payload.name)
    .bind(&payload.sku)
    .bind(&payload.description)
    .bind(payload.price)
    .bind(payload.sale_price)
    .bind(payload.quantity)
    .bind(payload.allow_backorder)
    .bind(payload.category_id)
    .fetch_one(&state.db)
    .await?;

    tracing::info!("Successfully created product with id: {}", product.id);
    Ok((StatusCode::CREATED, Json(product)))
}

/// Handler for GET /api/products
/// Retrieves all products
#[utoipa::path(
    get,
    path = "/api/products",
    responses(
        (status = 200, description = "List of all products", body = Vec<Product>)
    ),
    tag = "products"
)]
async fn get_all_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>, ApiError> {
    let products = sqlx::query_as::<_, Product>(&format!(
        "SELECT {} FROM products ORDER BY id",
        PRODUCT_COLUMNS
    ))
    .fetch_all(&state.db)
    .await?;

    tracing::debug!("Retrieved {} products", products.len());
    Ok(Json(products))
}

/// Handler for GET /api/products/:id
/// Retrieves a specific product by ID
#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(
        ("id" = i32, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product found", body = Product),
        (status = 404, description = "Product not found")
    ),
    tag = "products"
)]
async fn get_product_by_id(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Product>, ApiError> {
    let product = state
        .product_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound {
            resource: "Product".to_string(),
            id: id.to_string(),
        })?;

    Ok(Json(product))
}

/// Handler for PUT /api/products/:id
/// Updates an existing product (staff only)
///
/// Runs inside a transaction so the duplicate-SKU check and the update are
/// atomic.
#[utoipa::path(
    put,
    path = "/api/products/{id}",
    params(
        ("id" = i32, Path, description = "Product ID")
    ),
    request_body = UpdateProduct,
    responses(
        (status = 200, description = "Product updated successfully", body = Product),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Duplicate SKU")
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
async fn update_product(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateProduct>,
) -> Result<Json<Product>, ApiError> {
    if !user.is_staff() {
        return Err(ApiError::Forbidden(
            "Only staff may manage products".to_string(),
        ));
    }

    payload.validate()?;

    let mut tx = state.db.begin().await?;

    let existing = sqlx::query_as::<_, Product>(&format!(
        "SELECT {} FROM products WHERE id = $1",
        PRODUCT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| ApiError::NotFound {
        resource: "Product".to_string(),
        id: id.to_string(),
    })?;

    if let Some(ref new_sku) = payload.sku {
        if new_sku != &existing.sku {
            let duplicate_exists: Option<bool> = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM products WHERE sku = $1 AND id != $2)",
            )
            .bind(new_sku)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

            if duplicate_exists.unwrap_or(false) {
                return Err(ApiError::Conflict {
                    message: format!("Product with SKU '{}' already exists", new_sku),
                });
            }
        }
    }

    // Each optional field maps to exactly one column; omitted fields keep
    // their existing values
    let updated = sqlx::query_as::<_, Product>(&format!(
        r#"
        UPDATE products
        SET name = $1,
            sku = $2,
            description = $3,
            price = $4,
            sale_price = $5,
            quantity = $6,
            allow_backorder = $7,
            category_id = $8,
            updated_at = NOW()
        WHERE id = $9
        RETURNING {}
        "#,
        PRODUCT_COLUMNS
    ))
    .bind(payload.name.unwrap_or(existing.name))
    .bind(payload.sku.unwrap_or(existing.sku))
    .bind(payload.description.unwrap_or(existing.description))
    .bind(payload.price.unwrap_or(existing.price))
    .bind(payload.sale_price.or(existing.sale_price))
    .bind(payload.quantity.unwrap_or(existing.quantity))
    .bind(payload.allow_backorder.unwrap_or(existing.allow_backorder))
    .bind(payload.category_id.or(existing.category_id))
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!("Successfully updated product with id: {}", id);
    Ok(Json(updated))
}

/// Creates and configures the application router
/// Wires repositories and services into shared state and maps all endpoints
fn create_router(db: PgPool) -> Router {
    use tower_http::cors::{Any, CorsLayer};

    let product_repo = ProductRepository::new(db.clone());
    let cart_repo = CartRepository::new(db.clone());
    let orders_repo = OrdersRepository::new(db.clone());
    let order_items_repo = OrderItemsRepository::new(db.clone());
    let promotion_service = PromotionService::new(PromotionRepository::new(db.clone()));
    let order_service = OrderService::new(
        orders_repo,
        order_items_repo.clone(),
        cart_repo.clone(),
        product_repo.clone(),
        promotion_service.clone(),
    );

    let state = AppState {
        db,
        product_repo,
        cart_repo,
        order_items_repo,
        promotion_service,
        order_service,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Product catalog
        .route("/api/products", post(create_product))
        .route("/api/products", get(get_all_products))
        .route("/api/products/:id", get(get_product_by_id))
        .route("/api/products/:id", put(update_product))
        // Cart
        .route("/api/cart", get(cart::get_cart_handler))
        .route("/api/cart/items", post(cart::add_cart_item_handler))
        .route(
            "/api/cart/items/:product_id",
            delete(cart::remove_cart_item_handler),
        )
        // Promotions
        .route(
            "/api/promotions/validate-coupon",
            post(promotions::validate_coupon_handler),
        )
        .route("/api/promotions/quote", post(promotions::quote_handler))
        .route(
            "/api/promotions/applicable",
            get(promotions::applicable_discounts_handler),
        )
        // Orders
        .route("/api/orders", post(orders::create_order_handler))
        .route("/api/orders", get(orders::get_order_history_handler))
        .route("/api/orders/:order_id", get(orders::get_order_by_id_handler))
        .route(
            "/api/orders/:order_id/cancel",
            post(orders::cancel_order_handler),
        )
        .route(
            "/api/orders/:order_id/status",
            patch(orders::update_order_status_handler),
        )
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("Storefront API - Starting...");

    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());

    tracing::info!("Connecting to database...");
    let db_pool = db::create_pool(&database_url)
        .await
        .expect("Failed to create database pool");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations completed successfully");

    let app = create_router(db_pool);

    let addr = format!("{}:{}", host, port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Storefront API is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
