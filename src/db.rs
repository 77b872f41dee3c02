use crate::error::ApiError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Type alias for the PostgreSQL connection pool
pub type DbPool = PgPool;

/// Creates and configures a PostgreSQL connection pool
///
/// # Arguments
/// * `database_url` - PostgreSQL connection string
///
/// # Returns
/// * `Result<DbPool>` - Configured connection pool or error
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    tracing::debug!("Creating database connection pool");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect(database_url)
        .await?;

    tracing::info!("Database connection pool created successfully");
    Ok(pool)
}

/// Check if a product with the given SKU already exists
pub async fn check_duplicate_sku(pool: &PgPool, sku: &str) -> Result<bool, ApiError> {
    let exists: Option<bool> =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE sku = $1)")
            .bind(sku)
            .fetch_one(pool)
            .await?;

    Ok(exists.unwrap_or(false))
}

/// Check if a coupon with the given code already exists
///
/// Codes are stored upper-cased, so the lookup upper-cases the input to make
/// the check case-insensitive.
pub async fn check_duplicate_coupon_code(pool: &PgPool, code: &str) -> Result<bool, ApiError> {
    let exists: Option<bool> =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM coupons WHERE code = $1)")
            .bind(code.to_uppercase())
            .fetch_one(pool)
            .await?;

    Ok(exists.unwrap_or(false))
}
