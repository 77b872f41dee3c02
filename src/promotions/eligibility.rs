// Eligibility evaluation shared by all promotion kinds
//
// Evaluation is pure: it reads the promotion, its scope and a context
// snapshot, and never touches storage. Callers may therefore run it
// speculatively (listing applicable discounts) without side effects. The
// checkout transaction re-checks limits authoritatively before committing.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::promotions::{AppliesTo, BogoOffer, Campaign, CampaignStatus, Coupon, CouponStatus, PromotionScope};

/// Snapshot of the cart/user state a promotion is evaluated against
#[derive(Debug, Clone)]
pub struct EligibilityContext {
    pub user_id: i32,
    /// Order amount the discount would be computed from
    pub order_amount: Decimal,
    /// Total item quantity in the cart (or the buy quantity for BOGO)
    pub quantity: i32,
    pub product_ids: Vec<i32>,
    pub category_ids: Vec<i32>,
    pub now: DateTime<Utc>,
    /// Ledger-derived total redemptions of this promotion
    pub total_usage: i64,
    /// Ledger-derived redemptions of this promotion by this user
    pub customer_usage: i64,
    /// Non-cancelled orders this user has placed (first-order segments)
    pub prior_orders: i64,
}

/// Outcome of an eligibility evaluation
///
/// Failures carry the first violated rule, in check order, so the reported
/// reason is deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eligibility {
    pub is_valid: bool,
    pub reason: Option<String>,
}

impl Eligibility {
    pub fn ok() -> Self {
        Self {
            is_valid: true,
            reason: None,
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            reason: Some(reason.into()),
        }
    }
}

/// Common evaluation surface of the three promotion kinds
///
/// Campaign, Coupon and BogoOffer differ in fields and lifecycle but share
/// the same rule pipeline; this trait is what the shared driver consumes.
pub trait Evaluable {
    /// Whether the promotion is in its "active" lifecycle state
    fn is_active(&self) -> bool;

    /// Validity window; a missing end means unbounded
    fn window(&self) -> (DateTime<Utc>, Option<DateTime<Utc>>);

    fn usage_limit(&self) -> Option<i32>;

    fn usage_limit_per_customer(&self) -> Option<i32>;

    fn minimum_order_amount(&self) -> Option<Decimal>;

    fn minimum_quantity(&self) -> Option<i32>;

    fn applies_to(&self) -> AppliesTo;
}

impl Evaluable for Campaign {
    fn is_active(&self) -> bool {
        self.status == CampaignStatus::Active
    }

    fn window(&self) -> (DateTime<Utc>, Option<DateTime<Utc>>) {
        (self.start_date, Some(self.end_date))
    }

    fn usage_limit(&self) -> Option<i32> {
        self.usage_limit
    }

    fn usage_limit_per_customer(&self) -> Option<i32> {
        self.usage_limit_per_customer
    }

    fn minimum_order_amount(&self) -> Option<Decimal> {
        self.minimum_order_amount
    }

    fn minimum_quantity(&self) -> Option<i32> {
        self.minimum_quantity
    }

    fn applies_to(&self) -> AppliesTo {
        self.applies_to
    }
}

impl Evaluable for Coupon {
    fn is_active(&self) -> bool {
        self.status == CouponStatus::Active
    }

    fn window(&self) -> (DateTime<Utc>, Option<DateTime<Utc>>) {
        (self.valid_from, self.valid_until)
    }

    fn usage_limit(&self) -> Option<i32> {
        self.usage_limit
    }

    fn usage_limit_per_customer(&self) -> Option<i32> {
        self.usage_limit_per_customer
    }

    fn minimum_order_amount(&self) -> Option<Decimal> {
        self.minimum_order_amount
    }

    fn minimum_quantity(&self) -> Option<i32> {
        None
    }

    fn applies_to(&self) -> AppliesTo {
        self.applies_to
    }
}

impl Evaluable for BogoOffer {
    fn is_active(&self) -> bool {
        self.is_active
    }

    fn window(&self) -> (DateTime<Utc>, Option<DateTime<Utc>>) {
        (self.start_date, Some(self.end_date))
    }

    fn usage_limit(&self) -> Option<i32> {
        self.usage_limit
    }

    fn usage_limit_per_customer(&self) -> Option<i32> {
        self.usage_limit_per_customer
    }

    fn minimum_order_amount(&self) -> Option<Decimal> {
        None
    }

    /// The buy quantity is the offer's minimum; the context carries the
    /// requested buy quantity
    fn minimum_quantity(&self) -> Option<i32> {
        Some(self.buy_quantity)
    }

    /// Buy/get product matching is handled by the orchestrator; the shared
    /// pipeline treats the offer as unscoped
    fn applies_to(&self) -> AppliesTo {
        AppliesTo::All
    }
}

/// Evaluate a promotion against a cart context
///
/// Checks run in a fixed order and short-circuit on the first failure:
/// status, window, total usage limit, per-customer limit, minimum order
/// amount, minimum quantity, applicability.
pub fn evaluate(
    promotion: &impl Evaluable,
    scope: &PromotionScope,
    ctx: &EligibilityContext,
) -> Eligibility {
    if !promotion.is_active() {
        return Eligibility::fail("not active");
    }

    let (start, end) = promotion.window();
    if ctx.now < start {
        return Eligibility::fail("not yet valid");
    }
    if let Some(end) = end {
        if ctx.now > end {
            return Eligibility::fail("expired");
        }
    }

    if let Some(limit) = promotion.usage_limit() {
        if ctx.total_usage >= i64::from(limit) {
            return Eligibility::fail("usage limit reached");
        }
    }

    if let Some(limit) = promotion.usage_limit_per_customer() {
        if ctx.customer_usage >= i64::from(limit) {
            return Eligibility::fail("per-customer limit reached");
        }
    }

    if let Some(minimum) = promotion.minimum_order_amount() {
        if ctx.order_amount < minimum {
            return Eligibility::fail(format!("minimum order amount of {} required", minimum));
        }
    }

    if let Some(minimum) = promotion.minimum_quantity() {
        if ctx.quantity < minimum {
            return Eligibility::fail(format!("minimum quantity of {} required", minimum));
        }
    }

    match promotion.applies_to() {
        AppliesTo::All => Eligibility::ok(),
        AppliesTo::Products => {
            if scope
                .product_ids
                .iter()
                .any(|id| ctx.product_ids.contains(id))
            {
                Eligibility::ok()
            } else {
                Eligibility::fail("not applicable to items in cart")
            }
        }
        AppliesTo::Categories => {
            if scope
                .category_ids
                .iter()
                .any(|id| ctx.category_ids.contains(id))
            {
                Eligibility::ok()
            } else {
                Eligibility::fail("not applicable to items in cart")
            }
        }
        AppliesTo::FirstOrder => {
            if ctx.prior_orders == 0 {
                Eligibility::ok()
            } else {
                Eligibility::fail("only valid on a first order")
            }
        }
        AppliesTo::ReturningCustomers => {
            if ctx.prior_orders > 0 {
                Eligibility::ok()
            } else {
                Eligibility::fail("only valid for returning customers")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::promotions::{DiscountType, GetDiscountType};
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn context() -> EligibilityContext {
        EligibilityContext {
            user_id: 7,
            order_amount: dec!(100),
            quantity: 2,
            product_ids: vec![1, 2],
            category_ids: vec![10],
            now: Utc::now(),
            total_usage: 0,
            customer_usage: 0,
            prior_orders: 3,
        }
    }

    fn coupon() -> Coupon {
        let now = Utc::now();
        Coupon {
            id: 1,
            code: "SAVE20".to_string(),
            name: "Save 20%".to_string(),
            description: None,
            status: CouponStatus::Active,
            discount_type: DiscountType::Percentage,
            discount_value: dec!(20),
            max_discount_amount: None,
            valid_from: now - Duration::days(1),
            valid_until: Some(now + Duration::days(30)),
            usage_limit: None,
            usage_limit_per_customer: None,
            usage_count: 0,
            applies_to: AppliesTo::All,
            minimum_order_amount: None,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn campaign() -> Campaign {
        let now = Utc::now();
        Campaign {
            id: 1,
            name: "Summer sale".to_string(),
            description: None,
            status: CampaignStatus::Active,
            discount_type: DiscountType::FixedAmount,
            discount_value: dec!(50),
            max_discount_amount: None,
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(7),
            usage_limit: None,
            usage_limit_per_customer: None,
            usage_count: 0,
            applies_to: AppliesTo::All,
            minimum_order_amount: None,
            minimum_quantity: None,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn bogo() -> BogoOffer {
        let now = Utc::now();
        BogoOffer {
            id: 1,
            name: "Buy 2 get 1 free".to_string(),
            is_active: true,
            buy_product_id: 1,
            buy_quantity: 2,
            get_product_id: 2,
            get_quantity: 1,
            get_discount_type: GetDiscountType::Free,
            get_discount_value: Decimal::ZERO,
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(7),
            usage_limit: None,
            usage_limit_per_customer: None,
            usage_count: 0,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_active_coupon_in_window_is_valid() {
        let result = evaluate(&coupon(), &PromotionScope::default(), &context());
        assert!(result.is_valid);
        assert_eq!(result.reason, None);
    }

    #[test]
    fn test_inactive_coupon_fails_with_not_active() {
        let mut coupon = coupon();
        coupon.status = CouponStatus::Inactive;
        let result = evaluate(&coupon, &PromotionScope::default(), &context());
        assert!(!result.is_valid);
        assert_eq!(result.reason.as_deref(), Some("not active"));
    }

    #[test]
    fn test_coupon_before_valid_from_is_not_yet_valid() {
        let mut coupon = coupon();
        coupon.valid_from = Utc::now() + Duration::days(1);
        let result = evaluate(&coupon, &PromotionScope::default(), &context());
        assert_eq!(result.reason.as_deref(), Some("not yet valid"));
    }

    #[test]
    fn test_coupon_past_valid_until_is_expired() {
        let mut coupon = coupon();
        coupon.valid_from = Utc::now() - Duration::days(30);
        coupon.valid_until = Some(Utc::now() - Duration::days(1));
        let result = evaluate(&coupon, &PromotionScope::default(), &context());
        assert_eq!(result.reason.as_deref(), Some("expired"));
    }

    #[test]
    fn test_coupon_without_valid_until_never_expires() {
        let mut coupon = coupon();
        coupon.valid_from = Utc::now() - Duration::days(3650);
        coupon.valid_until = None;
        let result = evaluate(&coupon, &PromotionScope::default(), &context());
        assert!(result.is_valid);
    }

    #[test]
    fn test_usage_limit_reached() {
        let mut coupon = coupon();
        coupon.usage_limit = Some(100);
        let mut ctx = context();
        ctx.total_usage = 100;
        let result = evaluate(&coupon, &PromotionScope::default(), &ctx);
        assert_eq!(result.reason.as_deref(), Some("usage limit reached"));
    }

    #[test]
    fn test_usage_below_limit_is_valid() {
        let mut coupon = coupon();
        coupon.usage_limit = Some(100);
        let mut ctx = context();
        ctx.total_usage = 99;
        assert!(evaluate(&coupon, &PromotionScope::default(), &ctx).is_valid);
    }

    #[test]
    fn test_per_customer_limit_reached() {
        let mut coupon = coupon();
        coupon.usage_limit = Some(1000);
        coupon.usage_limit_per_customer = Some(2);
        let mut ctx = context();
        // Global headroom remains; the per-customer limit still blocks
        ctx.total_usage = 5;
        ctx.customer_usage = 2;
        let result = evaluate(&coupon, &PromotionScope::default(), &ctx);
        assert_eq!(result.reason.as_deref(), Some("per-customer limit reached"));
    }

    #[test]
    fn test_minimum_order_amount_gates() {
        let mut coupon = coupon();
        coupon.minimum_order_amount = Some(dec!(500));
        let mut ctx = context();
        ctx.order_amount = dec!(400);
        let result = evaluate(&coupon, &PromotionScope::default(), &ctx);
        assert!(!result.is_valid);
        let reason = result.reason.unwrap();
        assert!(reason.contains("minimum order amount"), "got: {}", reason);
        assert!(reason.contains("500"), "got: {}", reason);
    }

    #[test]
    fn test_minimum_order_amount_boundary_is_inclusive() {
        let mut coupon = coupon();
        coupon.minimum_order_amount = Some(dec!(500));
        let mut ctx = context();
        ctx.order_amount = dec!(500);
        assert!(evaluate(&coupon, &PromotionScope::default(), &ctx).is_valid);
    }

    #[test]
    fn test_campaign_minimum_quantity() {
        let mut campaign = campaign();
        campaign.minimum_quantity = Some(3);
        let mut ctx = context();
        ctx.quantity = 2;
        let result = evaluate(&campaign, &PromotionScope::default(), &ctx);
        assert_eq!(result.reason.as_deref(), Some("minimum quantity of 3 required"));
    }

    #[test]
    fn test_product_scope_requires_intersection() {
        let mut campaign = campaign();
        campaign.applies_to = AppliesTo::Products;
        let scope = PromotionScope {
            product_ids: vec![99],
            category_ids: vec![],
        };
        let result = evaluate(&campaign, &scope, &context());
        assert_eq!(
            result.reason.as_deref(),
            Some("not applicable to items in cart")
        );

        let scope = PromotionScope {
            product_ids: vec![2, 99],
            category_ids: vec![],
        };
        assert!(evaluate(&campaign, &scope, &context()).is_valid);
    }

    #[test]
    fn test_category_scope_requires_intersection() {
        let mut campaign = campaign();
        campaign.applies_to = AppliesTo::Categories;
        let scope = PromotionScope {
            product_ids: vec![],
            category_ids: vec![11],
        };
        let result = evaluate(&campaign, &scope, &context());
        assert!(!result.is_valid);

        let scope = PromotionScope {
            product_ids: vec![],
            category_ids: vec![10, 11],
        };
        assert!(evaluate(&campaign, &scope, &context()).is_valid);
    }

    #[test]
    fn test_first_order_segment() {
        let mut coupon = coupon();
        coupon.applies_to = AppliesTo::FirstOrder;
        let mut ctx = context();
        ctx.prior_orders = 0;
        assert!(evaluate(&coupon, &PromotionScope::default(), &ctx).is_valid);

        ctx.prior_orders = 1;
        let result = evaluate(&coupon, &PromotionScope::default(), &ctx);
        assert_eq!(result.reason.as_deref(), Some("only valid on a first order"));
    }

    #[test]
    fn test_returning_customers_segment() {
        let mut coupon = coupon();
        coupon.applies_to = AppliesTo::ReturningCustomers;
        let mut ctx = context();
        ctx.prior_orders = 0;
        let result = evaluate(&coupon, &PromotionScope::default(), &ctx);
        assert_eq!(
            result.reason.as_deref(),
            Some("only valid for returning customers")
        );
    }

    #[test]
    fn test_first_failure_wins() {
        // Inactive AND expired AND under minimum: status is checked first
        let mut coupon = coupon();
        coupon.status = CouponStatus::Expired;
        coupon.valid_until = Some(Utc::now() - Duration::days(1));
        coupon.minimum_order_amount = Some(dec!(10000));
        let result = evaluate(&coupon, &PromotionScope::default(), &context());
        assert_eq!(result.reason.as_deref(), Some("not active"));
    }

    #[test]
    fn test_bogo_buy_quantity_is_minimum_quantity() {
        let offer = bogo();
        let mut ctx = context();
        ctx.quantity = 1; // requested buy quantity below offer.buy_quantity
        let result = evaluate(&offer, &PromotionScope::default(), &ctx);
        assert_eq!(result.reason.as_deref(), Some("minimum quantity of 2 required"));

        ctx.quantity = 2;
        assert!(evaluate(&offer, &PromotionScope::default(), &ctx).is_valid);
    }

    #[test]
    fn test_paused_campaign_is_not_active() {
        let mut campaign = campaign();
        campaign.status = CampaignStatus::Paused;
        let result = evaluate(&campaign, &PromotionScope::default(), &context());
        assert_eq!(result.reason.as_deref(), Some("not active"));
    }
}
