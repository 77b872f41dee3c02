use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::promotions::{
    BogoOffer, Campaign, Coupon, NewUsageRecord, PromotionKind, PromotionScope,
};

const CAMPAIGN_COLUMNS: &str = "id, name, description, status, discount_type, discount_value, \
     max_discount_amount, start_date, end_date, usage_limit, usage_limit_per_customer, \
     usage_count, applies_to, minimum_order_amount, minimum_quantity, created_by, \
     created_at, updated_at";

const COUPON_COLUMNS: &str = "id, code, name, description, status, discount_type, discount_value, \
     max_discount_amount, valid_from, valid_until, usage_limit, usage_limit_per_customer, \
     usage_count, applies_to, minimum_order_amount, created_by, created_at, updated_at";

const BOGO_COLUMNS: &str = "id, name, is_active, buy_product_id, buy_quantity, get_product_id, \
     get_quantity, get_discount_type, get_discount_value, start_date, end_date, usage_limit, \
     usage_limit_per_customer, usage_count, created_by, created_at, updated_at";

/// Repository for promotion storage and the usage ledger
#[derive(Clone)]
pub struct PromotionRepository {
    pool: PgPool,
}

impl PromotionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a campaign by ID
    pub async fn find_campaign(&self, id: i32) -> Result<Option<Campaign>, sqlx::Error> {
        sqlx::query_as::<_, Campaign>(&format!(
            "SELECT {} FROM campaigns WHERE id = $1",
            CAMPAIGN_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Find a coupon by code
    ///
    /// Codes are stored upper-cased; upper-casing the input makes the lookup
    /// case-insensitive.
    pub async fn find_coupon_by_code(&self, code: &str) -> Result<Option<Coupon>, sqlx::Error> {
        sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {} FROM coupons WHERE code = $1",
            COUPON_COLUMNS
        ))
        .bind(code.to_uppercase())
        .fetch_optional(&self.pool)
        .await
    }

    /// Find a BOGO offer by ID
    pub async fn find_bogo(&self, id: i32) -> Result<Option<BogoOffer>, sqlx::Error> {
        sqlx::query_as::<_, BogoOffer>(&format!(
            "SELECT {} FROM bogo_offers WHERE id = $1",
            BOGO_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Campaigns currently in the active lifecycle state
    ///
    /// The window/limit checks stay with the evaluator; this only narrows
    /// the candidate set.
    pub async fn list_active_campaigns(&self) -> Result<Vec<Campaign>, sqlx::Error> {
        sqlx::query_as::<_, Campaign>(&format!(
            "SELECT {} FROM campaigns WHERE status = 'active' ORDER BY id",
            CAMPAIGN_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
    }

    /// BOGO offers currently switched on
    pub async fn list_active_bogo_offers(&self) -> Result<Vec<BogoOffer>, sqlx::Error> {
        sqlx::query_as::<_, BogoOffer>(&format!(
            "SELECT {} FROM bogo_offers WHERE is_active ORDER BY id",
            BOGO_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
    }

    /// Product/category ids a campaign is scoped to
    pub async fn campaign_scope(&self, campaign_id: i32) -> Result<PromotionScope, sqlx::Error> {
        let product_ids: Vec<i32> = sqlx::query_scalar(
            "SELECT product_id FROM campaign_products WHERE campaign_id = $1",
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await?;

        let category_ids: Vec<i32> = sqlx::query_scalar(
            "SELECT category_id FROM campaign_categories WHERE campaign_id = $1",
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(PromotionScope {
            product_ids,
            category_ids,
        })
    }

    /// Product/category ids a coupon is scoped to
    pub async fn coupon_scope(&self, coupon_id: i32) -> Result<PromotionScope, sqlx::Error> {
        let product_ids: Vec<i32> =
            sqlx::query_scalar("SELECT product_id FROM coupon_products WHERE coupon_id = $1")
                .bind(coupon_id)
                .fetch_all(&self.pool)
                .await?;

        let category_ids: Vec<i32> =
            sqlx::query_scalar("SELECT category_id FROM coupon_categories WHERE coupon_id = $1")
                .bind(coupon_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(PromotionScope {
            product_ids,
            category_ids,
        })
    }

    /// Total redemptions of a promotion, derived from the ledger
    pub async fn count_usages(
        &self,
        kind: PromotionKind,
        promotion_id: i32,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM promotion_usages WHERE promotion_kind = $1 AND promotion_id = $2",
        )
        .bind(kind)
        .bind(promotion_id)
        .fetch_one(&self.pool)
        .await
    }

    /// Redemptions of a promotion by one user, derived from the ledger
    pub async fn count_user_usages(
        &self,
        kind: PromotionKind,
        promotion_id: i32,
        user_id: i32,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM promotion_usages \
             WHERE promotion_kind = $1 AND promotion_id = $2 AND user_id = $3",
        )
        .bind(kind)
        .bind(promotion_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
    }

    /// Non-cancelled orders a user has placed (first-order segments)
    pub async fn count_user_orders(&self, user_id: i32) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM orders WHERE user_id = $1 AND status <> 'cancelled'",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
    }

    /// Per-user ledger count inside an open transaction (authoritative
    /// re-check at commit time)
    pub async fn count_user_usages_tx(
        conn: &mut PgConnection,
        kind: PromotionKind,
        promotion_id: i32,
        user_id: i32,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM promotion_usages \
             WHERE promotion_kind = $1 AND promotion_id = $2 AND user_id = $3",
        )
        .bind(kind)
        .bind(promotion_id)
        .bind(user_id)
        .fetch_one(conn)
        .await
    }

    /// A promotion's per-customer limit, read inside an open transaction
    pub async fn per_customer_limit_tx(
        conn: &mut PgConnection,
        kind: PromotionKind,
        promotion_id: i32,
    ) -> Result<Option<i32>, sqlx::Error> {
        let table = match kind {
            PromotionKind::Campaign => "campaigns",
            PromotionKind::Coupon => "coupons",
            PromotionKind::Bogo => "bogo_offers",
        };

        sqlx::query_scalar(&format!(
            "SELECT usage_limit_per_customer FROM {} WHERE id = $1",
            table
        ))
        .bind(promotion_id)
        .fetch_one(conn)
        .await
    }

    /// Append a usage ledger row inside an open transaction
    #[allow(clippy::too_many_arguments)]
    pub async fn record_usage(
        conn: &mut PgConnection,
        record: &NewUsageRecord,
        user_id: i32,
        order_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO promotion_usages
                (promotion_kind, promotion_id, user_id, order_id,
                 original_amount, discount_amount, final_amount,
                 ip_address, user_agent)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(record.promotion_kind)
        .bind(record.promotion_id)
        .bind(user_id)
        .bind(order_id)
        .bind(round2(record.original_amount))
        .bind(round2(record.discount_amount))
        .bind(round2(record.final_amount))
        .bind(record.ip_address.as_deref())
        .bind(record.user_agent.as_deref())
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Bump a promotion's usage_count cache inside an open transaction
    ///
    /// The WHERE clause re-checks the total limit so the cache can never be
    /// pushed past usage_limit even when two checkouts raced the advisory
    /// eligibility check. Returns false when the limit blocked the bump; the
    /// caller must roll back.
    pub async fn increment_usage_count(
        conn: &mut PgConnection,
        kind: PromotionKind,
        promotion_id: i32,
    ) -> Result<bool, sqlx::Error> {
        let table = match kind {
            PromotionKind::Campaign => "campaigns",
            PromotionKind::Coupon => "coupons",
            PromotionKind::Bogo => "bogo_offers",
        };

        let result = sqlx::query(&format!(
            "UPDATE {} SET usage_count = usage_count + 1, updated_at = NOW() \
             WHERE id = $1 AND (usage_limit IS NULL OR usage_count < usage_limit)",
            table
        ))
        .bind(promotion_id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn round2(amount: Decimal) -> Decimal {
    crate::promotions::DiscountCalculator::round_money(amount)
}
