//! Final charge computation.
//!
//! Everything here is pure: no I/O, no clock. Promo eligibility (window,
//! usage, minimum purchase) is checked separately by [`check_promo`] so a
//! quote and a checkout run the exact same rules.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;
use time::PrimitiveDateTime;
use tkl_sdk::objects::PriceBreakdown;

use crate::entities::DiscountType;
use crate::entities::catalog::Denomination;
use crate::entities::promo::Promo;

/// Why a promo cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromoRejection {
    #[error("Promo code is not active")]
    Inactive,
    #[error("Promo code is not active yet")]
    NotStarted,
    #[error("Promo code has expired")]
    Expired,
    #[error("Promo code usage limit reached")]
    UsageLimitReached,
    #[error("Minimum purchase for this promo is {0}")]
    BelowMinimumPurchase(i64),
}

/// Round half away from zero to a whole currency unit.
fn round_units(value: Decimal) -> i64 {
    let rounded = value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    rounded.to_i64().unwrap_or(if rounded.is_sign_negative() {
        i64::MIN
    } else {
        i64::MAX
    })
}

fn percentage_fee(denomination: &Denomination) -> i64 {
    round_units(Decimal::from(denomination.sell_price) * denomination.fee_pct)
}

/// Base price plus fees, before any discount.
pub fn subtotal(denomination: &Denomination) -> i64 {
    denomination
        .sell_price
        .saturating_add(denomination.fee_flat)
        .saturating_add(percentage_fee(denomination))
}

/// Compute the charge for `denomination`, optionally discounted by `promo`.
///
/// The result never has a negative total.
pub fn calculate(denomination: &Denomination, promo: Option<&Promo>) -> PriceBreakdown {
    let base_price = denomination.sell_price;
    let fee_flat = denomination.fee_flat;
    let fee_pct = percentage_fee(denomination);
    let subtotal = subtotal(denomination);

    let promo_discount = promo.map_or(0, |promo| discount(promo, subtotal));
    let total = subtotal.saturating_sub(promo_discount).max(0);

    PriceBreakdown {
        base_price,
        fee_flat,
        fee_pct,
        promo_discount,
        total,
    }
}

fn discount(promo: &Promo, subtotal: i64) -> i64 {
    let raw = match promo.discount_type {
        DiscountType::Percent => {
            let amount = round_units(Decimal::from(subtotal) * promo.value / Decimal::ONE_HUNDRED);
            match promo.max_discount {
                Some(cap) => amount.min(cap),
                None => amount,
            }
        }
        DiscountType::Flat => round_units(promo.value),
    };
    raw.max(0)
}

/// Check that `promo` may be used right now for a purchase of `subtotal`
/// (fees included).
pub fn check_promo(
    promo: &Promo,
    subtotal: i64,
    now: PrimitiveDateTime,
) -> Result<(), PromoRejection> {
    if !promo.is_active {
        return Err(PromoRejection::Inactive);
    }
    if now < promo.start_at {
        return Err(PromoRejection::NotStarted);
    }
    if now > promo.end_at {
        return Err(PromoRejection::Expired);
    }
    if !promo.has_capacity() {
        return Err(PromoRejection::UsageLimitReached);
    }
    if let Some(min) = promo.min_purchase {
        if subtotal < min {
            return Err(PromoRejection::BelowMinimumPurchase(min));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use uuid::Uuid;

    fn denom(sell: i64, fee_flat: i64, fee_pct: Decimal) -> Denomination {
        Denomination {
            id: Uuid::nil(),
            product_id: Uuid::nil(),
            label: "100 Diamonds".into(),
            amount: 100,
            sell_price: sell,
            cost_price: sell - 1_000,
            fee_flat,
            fee_pct,
            sort_order: 0,
            is_popular: false,
            provider_code: None,
            is_active: true,
        }
    }

    fn promo(discount_type: DiscountType, value: Decimal) -> Promo {
        Promo {
            id: Uuid::nil(),
            code: "HEMAT".into(),
            discount_type,
            value,
            max_discount: None,
            min_purchase: None,
            start_at: datetime!(2024-01-01 0:00),
            end_at: datetime!(2024-12-31 23:59),
            usage_limit: None,
            used_count: 0,
            is_active: true,
        }
    }

    #[test]
    fn flat_fee_only() {
        let price = calculate(&denom(50_000, 1_000, Decimal::ZERO), None);
        assert_eq!(price.fee_pct, 0);
        assert_eq!(price.total, 51_000);
    }

    #[test]
    fn percentage_fee_rounds_half_away_from_zero() {
        // 10_050 * 0.005 = 50.25 -> 50; 10_100 * 0.005 = 50.5 -> 51
        assert_eq!(calculate(&denom(10_050, 0, Decimal::new(5, 3)), None).fee_pct, 50);
        assert_eq!(calculate(&denom(10_100, 0, Decimal::new(5, 3)), None).fee_pct, 51);
    }

    #[test]
    fn percent_promo_is_capped() {
        let mut p = promo(DiscountType::Percent, Decimal::from(10));
        p.max_discount = Some(3_000);
        let price = calculate(&denom(50_000, 1_000, Decimal::ZERO), Some(&p));
        assert_eq!(price.promo_discount, 3_000);
        assert_eq!(price.total, 48_000);

        p.max_discount = None;
        let price = calculate(&denom(50_000, 1_000, Decimal::ZERO), Some(&p));
        assert_eq!(price.promo_discount, 5_100);
    }

    #[test]
    fn total_never_negative() {
        let p = promo(DiscountType::Flat, Decimal::from(1_000_000));
        let price = calculate(&denom(5_000, 500, Decimal::new(1, 2)), Some(&p));
        assert_eq!(price.total, 0);
        assert!(price.promo_discount > 5_550);
    }

    #[test]
    fn calculation_is_deterministic() {
        let d = denom(73_333, 777, Decimal::new(125, 4));
        let p = promo(DiscountType::Percent, Decimal::new(125, 1));
        for _ in 0..32 {
            assert_eq!(calculate(&d, Some(&p)), calculate(&d, Some(&p)));
        }
    }

    #[test]
    fn promo_window_and_limits() {
        let mut p = promo(DiscountType::Flat, Decimal::from(1000));
        assert_eq!(
            check_promo(&p, 10_000, datetime!(2025-01-01 0:00)),
            Err(PromoRejection::Expired)
        );
        assert_eq!(
            check_promo(&p, 10_000, datetime!(2023-06-01 0:00)),
            Err(PromoRejection::NotStarted)
        );
        assert_eq!(check_promo(&p, 10_000, datetime!(2024-06-01 0:00)), Ok(()));

        p.usage_limit = Some(1);
        p.used_count = 1;
        assert_eq!(
            check_promo(&p, 10_000, datetime!(2024-06-01 0:00)),
            Err(PromoRejection::UsageLimitReached)
        );

        p.usage_limit = None;
        p.min_purchase = Some(20_000);
        assert_eq!(
            check_promo(&p, 10_000, datetime!(2024-06-01 0:00)),
            Err(PromoRejection::BelowMinimumPurchase(20_000))
        );
    }

    #[test]
    fn minimum_purchase_counts_fees() {
        // 19_500 before fees, 20_000 once the flat fee is added.
        let d = denom(19_500, 500, Decimal::ZERO);
        let mut p = promo(DiscountType::Flat, Decimal::from(1000));
        p.min_purchase = Some(20_000);
        assert_eq!(check_promo(&p, subtotal(&d), datetime!(2024-06-01 0:00)), Ok(()));

        p.min_purchase = Some(20_001);
        assert_eq!(
            check_promo(&p, subtotal(&d), datetime!(2024-06-01 0:00)),
            Err(PromoRejection::BelowMinimumPurchase(20_001))
        );
    }

    #[test]
    fn expired_message_is_customer_facing() {
        assert_eq!(PromoRejection::Expired.to_string(), "Promo code has expired");
    }
}
