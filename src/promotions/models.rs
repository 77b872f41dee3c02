use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::validation::{validate_coupon_code, validate_non_negative_amount};

/// Campaign lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Draft,
    Scheduled,
    Active,
    Paused,
    Expired,
    Cancelled,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Draft => "draft",
            CampaignStatus::Scheduled => "scheduled",
            CampaignStatus::Active => "active",
            CampaignStatus::Paused => "paused",
            CampaignStatus::Expired => "expired",
            CampaignStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Coupon lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CouponStatus {
    Active,
    Inactive,
    Expired,
    UsedUp,
}

impl CouponStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CouponStatus::Active => "active",
            CouponStatus::Inactive => "inactive",
            CouponStatus::Expired => "expired",
            CouponStatus::UsedUp => "used_up",
        }
    }
}

impl std::fmt::Display for CouponStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a campaign/coupon discount value is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// discount_value is a percentage of the order amount (e.g. 10 = 10% off)
    Percentage,
    /// discount_value is subtracted from the order amount
    FixedAmount,
    /// Shipping is waived; contributes nothing to discount_amount itself
    FreeShipping,
}

impl std::fmt::Display for DiscountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscountType::Percentage => write!(f, "percentage"),
            DiscountType::FixedAmount => write!(f, "fixed_amount"),
            DiscountType::FreeShipping => write!(f, "free_shipping"),
        }
    }
}

/// How the "get" side of a BOGO offer is discounted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GetDiscountType {
    /// Get items are free
    Free,
    /// get_discount_value percent off each get item
    Percentage,
    /// get_discount_value off each get item
    FixedAmount,
}

/// Scope a promotion applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AppliesTo {
    All,
    Products,
    Categories,
    /// Coupon-only: customer must have no prior orders
    FirstOrder,
    /// Coupon-only: customer must have at least one prior order
    ReturningCustomers,
}

/// Promotion kind discriminator for the usage ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PromotionKind {
    Campaign,
    Coupon,
    Bogo,
}

impl PromotionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromotionKind::Campaign => "campaign",
            PromotionKind::Coupon => "coupon",
            PromotionKind::Bogo => "bogo",
        }
    }
}

impl std::fmt::Display for PromotionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Time-bound sales campaign
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Campaign {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub status: CampaignStatus,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub max_discount_amount: Option<Decimal>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub usage_limit: Option<i32>,
    pub usage_limit_per_customer: Option<i32>,
    /// Cache of ledger rows; the ledger is authoritative
    pub usage_count: i32,
    pub applies_to: AppliesTo,
    pub minimum_order_amount: Option<Decimal>,
    pub minimum_quantity: Option<i32>,
    pub created_by: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Code-activated coupon
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Coupon {
    pub id: i32,
    /// Stored upper-cased; matched case-insensitively
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub status: CouponStatus,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub max_discount_amount: Option<Decimal>,
    pub valid_from: DateTime<Utc>,
    /// Absent means the coupon never expires
    pub valid_until: Option<DateTime<Utc>>,
    pub usage_limit: Option<i32>,
    pub usage_limit_per_customer: Option<i32>,
    pub usage_count: i32,
    pub applies_to: AppliesTo,
    pub minimum_order_amount: Option<Decimal>,
    pub created_by: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// "Buy N of X, get M of Y at a discount" offer
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BogoOffer {
    pub id: i32,
    pub name: String,
    pub is_active: bool,
    pub buy_product_id: i32,
    pub buy_quantity: i32,
    pub get_product_id: i32,
    pub get_quantity: i32,
    pub get_discount_type: GetDiscountType,
    pub get_discount_value: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub usage_limit: Option<i32>,
    pub usage_limit_per_customer: Option<i32>,
    pub usage_count: i32,
    pub created_by: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A redemption row in the append-only usage ledger
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UsageRecord {
    pub id: i64,
    pub promotion_kind: PromotionKind,
    pub promotion_id: i32,
    pub user_id: i32,
    pub order_id: Uuid,
    pub original_amount: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
    pub used_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Ledger row prepared by the orchestrator, written by the checkout
/// transaction
#[derive(Debug, Clone)]
pub struct NewUsageRecord {
    pub promotion_kind: PromotionKind,
    pub promotion_id: i32,
    pub original_amount: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Product/category ids a promotion is scoped to
#[derive(Debug, Clone, Default)]
pub struct PromotionScope {
    pub product_ids: Vec<i32>,
    pub category_ids: Vec<i32>,
}

/// One applied promotion in a discount breakdown
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AppliedDiscount {
    pub kind: PromotionKind,
    pub promotion_id: i32,
    /// Coupon code or campaign/offer name, for display
    pub label: String,
    #[schema(value_type = f64)]
    pub original_amount: Decimal,
    #[schema(value_type = f64)]
    pub discount_amount: Decimal,
    /// True when the promotion waives shipping instead of reducing the amount
    pub free_shipping: bool,
}

/// A candidate promotion that did not apply, and why
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IneligiblePromotion {
    pub kind: PromotionKind,
    pub promotion_id: i32,
    pub label: String,
    pub reason: String,
}

/// Full totals breakdown produced by the orchestrator
///
/// Amounts are kept unrounded here; rounding to 2 decimal places happens at
/// the persistence boundary so stacked promotions do not compound rounding
/// error.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderTotals {
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
    pub discounts: Vec<AppliedDiscount>,
    pub ineligible: Vec<IneligiblePromotion>,
}

/// One line of a cart as the discount engine sees it
#[derive(Debug, Clone)]
pub struct CartLine {
    pub product_id: i32,
    pub quantity: i32,
    /// Unit price captured at add time
    pub price: Decimal,
    pub category_id: Option<i32>,
}

/// A requested BOGO application at checkout
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct BogoApplication {
    pub bogo_id: i32,
    pub buy_product_id: i32,
    pub buy_quantity: i32,
    pub get_product_id: i32,
}

/// The promotions a customer chose at checkout
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct DiscountSelection {
    pub coupon_code: Option<String>,
    pub campaign_id: Option<i32>,
    #[serde(default)]
    pub bogo_offers: Vec<BogoApplication>,
}

/// Request DTO for POST /api/promotions/validate-coupon
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ValidateCouponRequest {
    #[validate(custom = "validate_coupon_code")]
    #[schema(example = "SAVE20")]
    pub code: String,
    #[schema(value_type = f64, example = 400.0)]
    pub order_amount: Decimal,
    #[serde(default)]
    pub product_ids: Vec<i32>,
    #[serde(default)]
    pub category_ids: Vec<i32>,
}

/// Verdict returned by coupon validation
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CouponValidation {
    pub is_valid: bool,
    #[schema(value_type = f64)]
    pub discount_amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Request DTO for POST /api/promotions/quote
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct QuoteRequest {
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

/// Applicable-promotions listing for a cart
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApplicableDiscounts {
    pub eligible: Vec<AppliedDiscount>,
    pub ineligible: Vec<IneligiblePromotion>,
}
