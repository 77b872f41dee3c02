use rust_decimal::{Decimal, RoundingStrategy};

use crate::promotions::{DiscountType, GetDiscountType};

/// Service for computing monetary discounts from validated promotions
///
/// All arithmetic stays unrounded; `round_money` is applied once at the
/// persistence boundary so stacked promotions do not compound rounding
/// error.
pub struct DiscountCalculator;

impl DiscountCalculator {
    /// Compute a campaign/coupon discount for an order amount
    ///
    /// - percentage: order_amount x value / 100, clamped to
    ///   max_discount_amount when set
    /// - fixed_amount: min(value, order_amount)
    /// - free_shipping: 0 (shipping is waived by the totals computation,
    ///   not represented as a discount amount)
    ///
    /// The result never exceeds order_amount, so a final amount can never
    /// go negative from a single application.
    pub fn calculate(
        discount_type: DiscountType,
        discount_value: Decimal,
        max_discount_amount: Option<Decimal>,
        order_amount: Decimal,
    ) -> Decimal {
        match discount_type {
            DiscountType::Percentage => {
                let mut discount = order_amount * discount_value / Decimal::from(100);
                if let Some(cap) = max_discount_amount {
                    discount = discount.min(cap);
                }
                discount.min(order_amount).max(Decimal::ZERO)
            }
            DiscountType::FixedAmount => {
                discount_value.min(order_amount).max(Decimal::ZERO)
            }
            DiscountType::FreeShipping => Decimal::ZERO,
        }
    }

    /// Compute the get-side discount of a BOGO application
    ///
    /// The discount applies per get unit and is capped so it never exceeds
    /// the get-side subtotal.
    pub fn calculate_bogo(
        get_discount_type: GetDiscountType,
        get_discount_value: Decimal,
        get_quantity: i32,
        get_unit_price: Decimal,
    ) -> Decimal {
        let get_subtotal = Decimal::from(get_quantity) * get_unit_price;
        let discount = match get_discount_type {
            GetDiscountType::Free => get_subtotal,
            GetDiscountType::Percentage => get_subtotal * get_discount_value / Decimal::from(100),
            GetDiscountType::FixedAmount => Decimal::from(get_quantity) * get_discount_value,
        };
        discount.min(get_subtotal).max(Decimal::ZERO)
    }

    /// Final order total: subtotal + tax + shipping - discount, floored at 0
    pub fn order_total(
        subtotal: Decimal,
        tax_amount: Decimal,
        shipping_amount: Decimal,
        discount_amount: Decimal,
    ) -> Decimal {
        (subtotal + tax_amount + shipping_amount - discount_amount).max(Decimal::ZERO)
    }

    /// Round a currency amount to 2 decimal places for persistence
    pub fn round_money(amount: Decimal) -> Decimal {
        amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_percentage_discount() {
        let discount =
            DiscountCalculator::calculate(DiscountType::Percentage, dec!(20), None, dec!(400));
        assert_eq!(discount, dec!(80));
    }

    #[test]
    fn test_percentage_discount_respects_max_cap() {
        // 10% of 1000 is 100, capped at 80
        let discount = DiscountCalculator::calculate(
            DiscountType::Percentage,
            dec!(10),
            Some(dec!(80)),
            dec!(1000),
        );
        assert_eq!(discount, dec!(80));
    }

    #[test]
    fn test_percentage_discount_below_cap_is_untouched() {
        let discount = DiscountCalculator::calculate(
            DiscountType::Percentage,
            dec!(10),
            Some(dec!(500)),
            dec!(1000),
        );
        assert_eq!(discount, dec!(100));
    }

    #[test]
    fn test_percentage_over_hundred_clamps_to_order_amount() {
        let discount =
            DiscountCalculator::calculate(DiscountType::Percentage, dec!(150), None, dec!(200));
        assert_eq!(discount, dec!(200));
    }

    #[test]
    fn test_fixed_amount_discount() {
        let discount =
            DiscountCalculator::calculate(DiscountType::FixedAmount, dec!(50), None, dec!(1000));
        assert_eq!(discount, dec!(50));
    }

    #[test]
    fn test_fixed_amount_never_exceeds_order_amount() {
        let discount =
            DiscountCalculator::calculate(DiscountType::FixedAmount, dec!(200), None, dec!(120.50));
        assert_eq!(discount, dec!(120.50));
    }

    #[test]
    fn test_free_shipping_contributes_zero() {
        let discount =
            DiscountCalculator::calculate(DiscountType::FreeShipping, dec!(5), None, dec!(1000));
        assert_eq!(discount, Decimal::ZERO);
    }

    #[test]
    fn test_bogo_free() {
        let discount =
            DiscountCalculator::calculate_bogo(GetDiscountType::Free, Decimal::ZERO, 2, dec!(4.50));
        assert_eq!(discount, dec!(9.00));
    }

    #[test]
    fn test_bogo_percentage() {
        let discount =
            DiscountCalculator::calculate_bogo(GetDiscountType::Percentage, dec!(50), 2, dec!(10));
        assert_eq!(discount, dec!(10));
    }

    #[test]
    fn test_bogo_fixed_amount_per_unit() {
        let discount = DiscountCalculator::calculate_bogo(
            GetDiscountType::FixedAmount,
            dec!(3),
            2,
            dec!(10),
        );
        assert_eq!(discount, dec!(6));
    }

    #[test]
    fn test_bogo_fixed_amount_capped_at_get_subtotal() {
        // 2 units at 4.00; 5.00 off per unit would exceed the subtotal
        let discount = DiscountCalculator::calculate_bogo(
            GetDiscountType::FixedAmount,
            dec!(5),
            2,
            dec!(4),
        );
        assert_eq!(discount, dec!(8));
    }

    #[test]
    fn test_order_total() {
        let total = DiscountCalculator::order_total(dec!(100), dec!(8), dec!(5), dec!(20));
        assert_eq!(total, dec!(93));
    }

    #[test]
    fn test_order_total_floors_at_zero() {
        let total = DiscountCalculator::order_total(dec!(50), dec!(0), dec!(0), dec!(80));
        assert_eq!(total, Decimal::ZERO);
    }

    #[test]
    fn test_stacked_coupon_and_campaign_from_same_subtotal() {
        // subtotal=1000, coupon 10% max 80 -> 80; campaign flat 50 -> 50;
        // both off the original subtotal, summed: final = 870
        let subtotal = dec!(1000);
        let coupon = DiscountCalculator::calculate(
            DiscountType::Percentage,
            dec!(10),
            Some(dec!(80)),
            subtotal,
        );
        let campaign =
            DiscountCalculator::calculate(DiscountType::FixedAmount, dec!(50), None, subtotal);
        assert_eq!(coupon, dec!(80));
        assert_eq!(campaign, dec!(50));

        let total = DiscountCalculator::order_total(
            subtotal,
            Decimal::ZERO,
            Decimal::ZERO,
            coupon + campaign,
        );
        assert_eq!(total, dec!(870));
    }

    #[test]
    fn test_round_money_half_up() {
        assert_eq!(DiscountCalculator::round_money(dec!(10.005)), dec!(10.01));
        assert_eq!(DiscountCalculator::round_money(dec!(10.004)), dec!(10.00));
        assert_eq!(DiscountCalculator::round_money(dec!(3.333333)), dec!(3.33));
    }

    #[test]
    fn test_intermediate_amounts_stay_unrounded() {
        // 3.333% of 99.99 keeps full precision until round_money
        let discount =
            DiscountCalculator::calculate(DiscountType::Percentage, dec!(3.333), None, dec!(99.99));
        assert_eq!(discount, dec!(3.3326667));
        assert!(discount.scale() > 2);
        assert_eq!(DiscountCalculator::round_money(discount), dec!(3.33));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    /// Percentage discounts never exceed the order amount or the cap
    #[test]
    fn prop_percentage_discount_bounded() {
        proptest!(|(
            amount_cents in 1u32..=10_000_000u32,
            value_cents in 0u32..=20_000u32,
            cap_cents in proptest::option::of(0u32..=1_000_000u32)
        )| {
            let amount = Decimal::from(amount_cents) / Decimal::from(100);
            let value = Decimal::from(value_cents) / Decimal::from(100);
            let cap = cap_cents.map(|c| Decimal::from(c) / Decimal::from(100));

            let discount =
                DiscountCalculator::calculate(DiscountType::Percentage, value, cap, amount);

            prop_assert!(discount >= Decimal::ZERO);
            prop_assert!(discount <= amount);
            if let Some(cap) = cap {
                prop_assert!(discount <= cap);
            }
        });
    }

    /// Fixed discounts equal min(value, amount), so the final amount is
    /// never negative
    #[test]
    fn prop_fixed_discount_is_min_of_value_and_amount() {
        proptest!(|(
            amount_cents in 1u32..=10_000_000u32,
            value_cents in 0u32..=10_000_000u32
        )| {
            let amount = Decimal::from(amount_cents) / Decimal::from(100);
            let value = Decimal::from(value_cents) / Decimal::from(100);

            let discount =
                DiscountCalculator::calculate(DiscountType::FixedAmount, value, None, amount);

            prop_assert_eq!(discount, value.min(amount));
            prop_assert!(amount - discount >= Decimal::ZERO);
        });
    }

    /// BOGO discounts never exceed the get-side subtotal
    #[test]
    fn prop_bogo_discount_bounded_by_get_subtotal() {
        proptest!(|(
            quantity in 1i32..=50,
            price_cents in 1u32..=100_000u32,
            value_cents in 0u32..=200_000u32,
            kind in 0usize..3
        )| {
            let price = Decimal::from(price_cents) / Decimal::from(100);
            let value = Decimal::from(value_cents) / Decimal::from(100);
            let get_type = [
                GetDiscountType::Free,
                GetDiscountType::Percentage,
                GetDiscountType::FixedAmount,
            ][kind];

            let discount =
                DiscountCalculator::calculate_bogo(get_type, value, quantity, price);
            let subtotal = Decimal::from(quantity) * price;

            prop_assert!(discount >= Decimal::ZERO);
            prop_assert!(discount <= subtotal);
        });
    }

    /// The final total is never negative
    #[test]
    fn prop_order_total_non_negative() {
        proptest!(|(
            subtotal_cents in 0u32..=10_000_000u32,
            tax_cents in 0u32..=1_000_000u32,
            shipping_cents in 0u32..=100_000u32,
            discount_cents in 0u32..=20_000_000u32
        )| {
            let total = DiscountCalculator::order_total(
                Decimal::from(subtotal_cents) / Decimal::from(100),
                Decimal::from(tax_cents) / Decimal::from(100),
                Decimal::from(shipping_cents) / Decimal::from(100),
                Decimal::from(discount_cents) / Decimal::from(100),
            );
            prop_assert!(total >= Decimal::ZERO);
        });
    }

    /// Rounding is idempotent and lands on 2 decimal places
    #[test]
    fn prop_round_money_idempotent() {
        proptest!(|(raw in 0u64..=1_000_000_000u64, scale in 0u32..=8)| {
            let amount = Decimal::new(raw as i64, scale);
            let rounded = DiscountCalculator::round_money(amount);
            prop_assert_eq!(rounded, DiscountCalculator::round_money(rounded));
            prop_assert!(rounded.scale() <= 2);
        });
    }
}
