use chrono::Utc;
use rust_decimal::Decimal;

use crate::promotions::{
    evaluate, AppliedDiscount, ApplicableDiscounts, BogoOffer, CartLine, CouponValidation,
    DiscountCalculator, DiscountSelection, DiscountType, EligibilityContext, IneligiblePromotion,
    NewUsageRecord, OrderTotals, PromotionError, PromotionKind, PromotionRepository,
    PromotionScope,
};

/// Orchestrates eligibility evaluation and discount calculation across all
/// promotion kinds
///
/// All reads here are advisory; the checkout transaction re-checks limits
/// and stock authoritatively before committing.
#[derive(Clone)]
pub struct PromotionService {
    repo: PromotionRepository,
}

impl PromotionService {
    pub fn new(repo: PromotionRepository) -> Self {
        Self { repo }
    }

    /// Validate a coupon code against an order amount
    ///
    /// Unknown codes are an error (the customer explicitly entered the
    /// code); business-rule failures come back as data so the storefront
    /// can show the reason inline.
    pub async fn validate_coupon(
        &self,
        code: &str,
        user_id: i32,
        order_amount: Decimal,
        product_ids: &[i32],
        category_ids: &[i32],
    ) -> Result<CouponValidation, PromotionError> {
        let coupon = self
            .repo
            .find_coupon_by_code(code)
            .await?
            .ok_or_else(|| PromotionError::CouponNotFound(code.to_uppercase()))?;

        let scope = self.repo.coupon_scope(coupon.id).await?;
        let ctx = self
            .context_for(
                PromotionKind::Coupon,
                coupon.id,
                user_id,
                order_amount,
                0,
                product_ids.to_vec(),
                category_ids.to_vec(),
            )
            .await?;

        let eligibility = evaluate(&coupon, &scope, &ctx);
        if !eligibility.is_valid {
            return Ok(CouponValidation {
                is_valid: false,
                discount_amount: Decimal::ZERO,
                error_message: eligibility.reason,
            });
        }

        let discount = DiscountCalculator::calculate(
            coupon.discount_type,
            coupon.discount_value,
            coupon.max_discount_amount,
            order_amount,
        );

        Ok(CouponValidation {
            is_valid: true,
            discount_amount: discount,
            error_message: None,
        })
    }

    /// Compute the full totals breakdown for a cart and a discount selection
    ///
    /// Coupon and campaign discounts are both computed from the original
    /// subtotal and summed; they deliberately do not chain off each other's
    /// result. An explicitly requested coupon or campaign that fails aborts
    /// the calculation; BOGO requests that fail are reported as ineligible
    /// and skipped.
    pub async fn calculate_order_totals(
        &self,
        lines: &[CartLine],
        selection: &DiscountSelection,
        user_id: i32,
        tax_amount: Decimal,
        shipping_amount: Decimal,
    ) -> Result<OrderTotals, PromotionError> {
        if lines.is_empty() {
            return Err(PromotionError::EmptyCart);
        }

        let subtotal = cart_subtotal(lines);
        let quantity: i32 = lines.iter().map(|line| line.quantity).sum();
        let product_ids = unique_product_ids(lines);
        let category_ids = unique_category_ids(lines);

        let mut discounts: Vec<AppliedDiscount> = Vec::new();
        let mut ineligible: Vec<IneligiblePromotion> = Vec::new();

        // Campaign: explicitly requested, so a failure is an error
        if let Some(campaign_id) = selection.campaign_id {
            let campaign = self
                .repo
                .find_campaign(campaign_id)
                .await?
                .ok_or(PromotionError::CampaignNotFound(campaign_id))?;
            let scope = self.repo.campaign_scope(campaign.id).await?;
            let ctx = self
                .context_for(
                    PromotionKind::Campaign,
                    campaign.id,
                    user_id,
                    subtotal,
                    quantity,
                    product_ids.clone(),
                    category_ids.clone(),
                )
                .await?;

            let eligibility = evaluate(&campaign, &scope, &ctx);
            if !eligibility.is_valid {
                return Err(PromotionError::CampaignNotEligible {
                    id: campaign.id,
                    reason: eligibility.reason.unwrap_or_default(),
                });
            }

            let discount = DiscountCalculator::calculate(
                campaign.discount_type,
                campaign.discount_value,
                campaign.max_discount_amount,
                subtotal,
            );
            discounts.push(AppliedDiscount {
                kind: PromotionKind::Campaign,
                promotion_id: campaign.id,
                label: campaign.name.clone(),
                original_amount: subtotal,
                discount_amount: discount,
                free_shipping: campaign.discount_type == DiscountType::FreeShipping,
            });
        }

        // Coupon: also explicitly requested; computed from the same original
        // subtotal as the campaign, never from the discounted amount
        if let Some(ref code) = selection.coupon_code {
            let coupon = self
                .repo
                .find_coupon_by_code(code)
                .await?
                .ok_or_else(|| PromotionError::CouponNotFound(code.to_uppercase()))?;
            let scope = self.repo.coupon_scope(coupon.id).await?;
            let ctx = self
                .context_for(
                    PromotionKind::Coupon,
                    coupon.id,
                    user_id,
                    subtotal,
                    quantity,
                    product_ids.clone(),
                    category_ids.clone(),
                )
                .await?;

            let eligibility = evaluate(&coupon, &scope, &ctx);
            if !eligibility.is_valid {
                return Err(PromotionError::CouponNotEligible {
                    code: coupon.code.clone(),
                    reason: eligibility.reason.unwrap_or_default(),
                });
            }

            let discount = DiscountCalculator::calculate(
                coupon.discount_type,
                coupon.discount_value,
                coupon.max_discount_amount,
                subtotal,
            );
            discounts.push(AppliedDiscount {
                kind: PromotionKind::Coupon,
                promotion_id: coupon.id,
                label: coupon.code.clone(),
                original_amount: subtotal,
                discount_amount: discount,
                free_shipping: coupon.discount_type == DiscountType::FreeShipping,
            });
        }

        // BOGO applications: failures do not abort the calculation
        for application in &selection.bogo_offers {
            let offer = match self.repo.find_bogo(application.bogo_id).await? {
                Some(offer) => offer,
                None => {
                    ineligible.push(IneligiblePromotion {
                        kind: PromotionKind::Bogo,
                        promotion_id: application.bogo_id,
                        label: format!("BOGO offer {}", application.bogo_id),
                        reason: "offer not found".to_string(),
                    });
                    continue;
                }
            };

            // The requested buy quantity must meet the offer's threshold;
            // the cart line is checked again inside apply_bogo
            if application.buy_quantity < offer.buy_quantity {
                ineligible.push(IneligiblePromotion {
                    kind: PromotionKind::Bogo,
                    promotion_id: offer.id,
                    label: offer.name.clone(),
                    reason: format!("minimum quantity of {} required", offer.buy_quantity),
                });
                continue;
            }

            match self
                .apply_bogo(&offer, application.buy_product_id, application.get_product_id, lines, user_id)
                .await?
            {
                Ok(applied) => discounts.push(applied),
                Err(reason) => ineligible.push(IneligiblePromotion {
                    kind: PromotionKind::Bogo,
                    promotion_id: offer.id,
                    label: offer.name.clone(),
                    reason,
                }),
            }
        }

        Ok(assemble_totals(
            subtotal,
            tax_amount,
            shipping_amount,
            discounts,
            ineligible,
        ))
    }

    /// List promotions that could apply to a cart, with the discount each
    /// would produce, plus the ones that do not apply and why
    ///
    /// Coupons are excluded: they are code-activated and validated through
    /// `validate_coupon` instead.
    pub async fn applicable_discounts(
        &self,
        lines: &[CartLine],
        user_id: i32,
    ) -> Result<ApplicableDiscounts, PromotionError> {
        let mut eligible: Vec<AppliedDiscount> = Vec::new();
        let mut ineligible: Vec<IneligiblePromotion> = Vec::new();

        if lines.is_empty() {
            return Ok(ApplicableDiscounts {
                eligible,
                ineligible,
            });
        }

        let subtotal = cart_subtotal(lines);
        let quantity: i32 = lines.iter().map(|line| line.quantity).sum();
        let product_ids = unique_product_ids(lines);
        let category_ids = unique_category_ids(lines);

        for campaign in self.repo.list_active_campaigns().await? {
            let scope = self.repo.campaign_scope(campaign.id).await?;
            let ctx = self
                .context_for(
                    PromotionKind::Campaign,
                    campaign.id,
                    user_id,
                    subtotal,
                    quantity,
                    product_ids.clone(),
                    category_ids.clone(),
                )
                .await?;

            let eligibility = evaluate(&campaign, &scope, &ctx);
            if eligibility.is_valid {
                let discount = DiscountCalculator::calculate(
                    campaign.discount_type,
                    campaign.discount_value,
                    campaign.max_discount_amount,
                    subtotal,
                );
                eligible.push(AppliedDiscount {
                    kind: PromotionKind::Campaign,
                    promotion_id: campaign.id,
                    label: campaign.name.clone(),
                    original_amount: subtotal,
                    discount_amount: discount,
                    free_shipping: campaign.discount_type == DiscountType::FreeShipping,
                });
            } else {
                ineligible.push(IneligiblePromotion {
                    kind: PromotionKind::Campaign,
                    promotion_id: campaign.id,
                    label: campaign.name.clone(),
                    reason: eligibility.reason.unwrap_or_default(),
                });
            }
        }

        for offer in self.repo.list_active_bogo_offers().await? {
            match self
                .apply_bogo(&offer, offer.buy_product_id, offer.get_product_id, lines, user_id)
                .await?
            {
                Ok(applied) => eligible.push(applied),
                Err(reason) => ineligible.push(IneligiblePromotion {
                    kind: PromotionKind::Bogo,
                    promotion_id: offer.id,
                    label: offer.name.clone(),
                    reason,
                }),
            }
        }

        Ok(ApplicableDiscounts {
            eligible,
            ineligible,
        })
    }

    /// Evaluate one BOGO offer against a cart
    ///
    /// Returns Ok(Ok(applied)) when the offer applies, Ok(Err(reason)) when
    /// it does not; the outer error is reserved for storage failures.
    async fn apply_bogo(
        &self,
        offer: &BogoOffer,
        buy_product_id: i32,
        get_product_id: i32,
        lines: &[CartLine],
        user_id: i32,
    ) -> Result<Result<AppliedDiscount, String>, PromotionError> {
        if buy_product_id != offer.buy_product_id {
            return Ok(Err("buy product does not match offer".to_string()));
        }
        if get_product_id != offer.get_product_id {
            return Ok(Err("get product does not match offer".to_string()));
        }

        let buy_line = match lines.iter().find(|l| l.product_id == offer.buy_product_id) {
            Some(line) => line,
            None => return Ok(Err("buy product not in cart".to_string())),
        };
        let get_line = match lines.iter().find(|l| l.product_id == offer.get_product_id) {
            Some(line) => line,
            None => return Ok(Err("get product not in cart".to_string())),
        };

        // The cart line, not the request, is authoritative for the buy
        // quantity; the evaluator turns a shortfall into the minimum-quantity
        // failure
        let ctx = self
            .context_for(
                PromotionKind::Bogo,
                offer.id,
                user_id,
                cart_subtotal(lines),
                buy_line.quantity,
                unique_product_ids(lines),
                unique_category_ids(lines),
            )
            .await?;

        let eligibility = evaluate(offer, &PromotionScope::default(), &ctx);
        if !eligibility.is_valid {
            return Ok(Err(eligibility.reason.unwrap_or_default()));
        }

        // Only get units actually in the cart can be discounted
        let get_quantity = offer.get_quantity.min(get_line.quantity);
        let get_subtotal = Decimal::from(get_quantity) * get_line.price;
        let discount = DiscountCalculator::calculate_bogo(
            offer.get_discount_type,
            offer.get_discount_value,
            get_quantity,
            get_line.price,
        );

        Ok(Ok(AppliedDiscount {
            kind: PromotionKind::Bogo,
            promotion_id: offer.id,
            label: offer.name.clone(),
            original_amount: get_subtotal,
            discount_amount: discount,
            free_shipping: false,
        }))
    }

    /// Assemble the eligibility context for one promotion, filling the
    /// ledger-derived usage counts
    async fn context_for(
        &self,
        kind: PromotionKind,
        promotion_id: i32,
        user_id: i32,
        order_amount: Decimal,
        quantity: i32,
        product_ids: Vec<i32>,
        category_ids: Vec<i32>,
    ) -> Result<EligibilityContext, PromotionError> {
        let total_usage = self.repo.count_usages(kind, promotion_id).await?;
        let customer_usage = self
            .repo
            .count_user_usages(kind, promotion_id, user_id)
            .await?;
        let prior_orders = self.repo.count_user_orders(user_id).await?;

        Ok(EligibilityContext {
            user_id,
            order_amount,
            quantity,
            product_ids,
            category_ids,
            now: Utc::now(),
            total_usage,
            customer_usage,
            prior_orders,
        })
    }
}

/// Map a totals breakdown to the ledger rows the checkout transaction writes
pub fn usage_records(
    totals: &OrderTotals,
    ip_address: Option<String>,
    user_agent: Option<String>,
) -> Vec<NewUsageRecord> {
    totals
        .discounts
        .iter()
        .map(|applied| NewUsageRecord {
            promotion_kind: applied.kind,
            promotion_id: applied.promotion_id,
            original_amount: applied.original_amount,
            discount_amount: applied.discount_amount,
            final_amount: applied.original_amount - applied.discount_amount,
            ip_address: ip_address.clone(),
            user_agent: user_agent.clone(),
        })
        .collect()
}

fn cart_subtotal(lines: &[CartLine]) -> Decimal {
    lines
        .iter()
        .map(|line| line.price * Decimal::from(line.quantity))
        .sum()
}

fn unique_product_ids(lines: &[CartLine]) -> Vec<i32> {
    let mut ids: Vec<i32> = lines.iter().map(|line| line.product_id).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

fn unique_category_ids(lines: &[CartLine]) -> Vec<i32> {
    let mut ids: Vec<i32> = lines.iter().filter_map(|line| line.category_id).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Fold applied discounts into the final totals
///
/// A free-shipping promotion zeroes the shipping amount instead of adding to
/// discount_amount; everything else sums, and the total floors at zero.
fn assemble_totals(
    subtotal: Decimal,
    tax_amount: Decimal,
    shipping_amount: Decimal,
    discounts: Vec<AppliedDiscount>,
    ineligible: Vec<IneligiblePromotion>,
) -> OrderTotals {
    let discount_amount: Decimal = discounts.iter().map(|d| d.discount_amount).sum();
    let shipping_amount = if discounts.iter().any(|d| d.free_shipping) {
        Decimal::ZERO
    } else {
        shipping_amount
    };
    let total_amount =
        DiscountCalculator::order_total(subtotal, tax_amount, shipping_amount, discount_amount);

    OrderTotals {
        subtotal,
        tax_amount,
        shipping_amount,
        discount_amount,
        total_amount,
        discounts,
        ineligible,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(product_id: i32, quantity: i32, price: Decimal) -> CartLine {
        CartLine {
            product_id,
            quantity,
            price,
            category_id: Some(product_id * 10),
        }
    }

    fn applied(kind: PromotionKind, id: i32, amount: Decimal, free_shipping: bool) -> AppliedDiscount {
        AppliedDiscount {
            kind,
            promotion_id: id,
            label: format!("promo {}", id),
            original_amount: dec!(1000),
            discount_amount: amount,
            free_shipping,
        }
    }

    #[test]
    fn test_cart_subtotal_and_id_extraction() {
        let lines = vec![line(1, 2, dec!(4.50)), line(2, 1, dec!(10)), line(1, 1, dec!(4.50))];
        assert_eq!(cart_subtotal(&lines), dec!(23.50));
        assert_eq!(unique_product_ids(&lines), vec![1, 2]);
        assert_eq!(unique_category_ids(&lines), vec![10, 20]);
    }

    #[test]
    fn test_assemble_totals_sums_discounts() {
        let totals = assemble_totals(
            dec!(1000),
            Decimal::ZERO,
            Decimal::ZERO,
            vec![
                applied(PromotionKind::Coupon, 1, dec!(80), false),
                applied(PromotionKind::Campaign, 2, dec!(50), false),
            ],
            vec![],
        );
        assert_eq!(totals.discount_amount, dec!(130));
        assert_eq!(totals.total_amount, dec!(870));
    }

    #[test]
    fn test_assemble_totals_floors_at_zero() {
        let totals = assemble_totals(
            dec!(50),
            Decimal::ZERO,
            Decimal::ZERO,
            vec![applied(PromotionKind::Campaign, 1, dec!(80), false)],
            vec![],
        );
        assert_eq!(totals.total_amount, Decimal::ZERO);
    }

    #[test]
    fn test_assemble_totals_free_shipping_zeroes_shipping() {
        let totals = assemble_totals(
            dec!(100),
            dec!(8),
            dec!(12),
            vec![applied(PromotionKind::Coupon, 1, Decimal::ZERO, true)],
            vec![],
        );
        assert_eq!(totals.shipping_amount, Decimal::ZERO);
        assert_eq!(totals.discount_amount, Decimal::ZERO);
        assert_eq!(totals.total_amount, dec!(108));
    }

    #[test]
    fn test_usage_records_mapping() {
        let totals = assemble_totals(
            dec!(1000),
            Decimal::ZERO,
            Decimal::ZERO,
            vec![
                applied(PromotionKind::Coupon, 1, dec!(80), false),
                applied(PromotionKind::Bogo, 3, dec!(9), false),
            ],
            vec![],
        );
        let records = usage_records(&totals, Some("10.0.0.1".to_string()), None);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].promotion_kind, PromotionKind::Coupon);
        assert_eq!(records[0].final_amount, dec!(920));
        assert_eq!(records[1].promotion_id, 3);
        assert_eq!(records[0].ip_address.as_deref(), Some("10.0.0.1"));
    }

    // calculate_order_totals / validate_coupon / applicable_discounts hit
    // the database through PromotionRepository and are covered by the
    // integration suite; the arithmetic and eligibility rules they compose
    // are unit-tested in calculator.rs and eligibility.rs.
}
