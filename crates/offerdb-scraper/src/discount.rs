use offerdb_core::{NormalizedOffer, PricingScheme};
use rust_decimal::{Decimal, RoundingStrategy};

/// Discount percentage implied by an offer's scheme fields, rounded to two
/// decimals with halves away from zero.
///
/// A sale price above the original yields a negative discount, which is kept
/// as-is. Offers with no original baseline, an unknown scheme, or prices so
/// extreme that the arithmetic overflows are worth zero.
#[must_use]
pub fn compute_discount(offer: &NormalizedOffer) -> Decimal {
    let (baseline, sale_total) = match offer.scheme {
        PricingScheme::PercentageOff => return Decimal::from(offer.percent_off_value),
        PricingScheme::SinglePrice => (Some(offer.original_price), offer.sale_price),
        PricingScheme::MultiBuy => (
            offer
                .original_price
                .checked_mul(Decimal::from(offer.sale_quantity)),
            offer.sale_price_total,
        ),
        PricingScheme::Unknown => return Decimal::ZERO,
    };

    let discount = baseline.and_then(|baseline| {
        if baseline.is_zero() {
            return Some(Decimal::ZERO);
        }
        baseline
            .checked_sub(sale_total)?
            .checked_div(baseline)?
            .checked_mul(Decimal::ONE_HUNDRED)
    });

    match discount {
        Some(discount) => {
            discount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        }
        None => {
            tracing::warn!(
                store = %offer.store_name,
                product = %offer.product_name,
                scheme = %offer.scheme,
                original_price = %offer.original_price,
                sale_quantity = offer.sale_quantity,
                sale_total = %sale_total,
                "discount arithmetic overflowed; recording zero"
            );
            Decimal::ZERO
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn offer(scheme: PricingScheme) -> NormalizedOffer {
        NormalizedOffer {
            scheme,
            ..NormalizedOffer::default()
        }
    }

    #[test]
    fn single_price_discount() {
        let mut o = offer(PricingScheme::SinglePrice);
        o.original_price = dec("100");
        o.sale_price = dec("75");
        assert_eq!(compute_discount(&o), dec("25.00"));
    }

    #[test]
    fn single_price_without_original_is_zero() {
        let mut o = offer(PricingScheme::SinglePrice);
        o.sale_price = dec("75");
        assert_eq!(compute_discount(&o), Decimal::ZERO);
    }

    #[test]
    fn multibuy_discount_rounds_to_two_places() {
        let mut o = offer(PricingScheme::MultiBuy);
        o.original_price = dec("20");
        o.sale_quantity = 3;
        o.sale_price_total = dec("50");
        assert_eq!(compute_discount(&o), dec("16.67"));
    }

    #[test]
    fn multibuy_with_zero_quantity_is_zero() {
        let mut o = offer(PricingScheme::MultiBuy);
        o.original_price = dec("20");
        o.sale_price_total = dec("50");
        assert_eq!(compute_discount(&o), Decimal::ZERO);
    }

    #[test]
    fn percentage_is_taken_verbatim() {
        let mut o = offer(PricingScheme::PercentageOff);
        o.percent_off_value = 30;
        o.original_price = dec("100");
        o.sale_price = dec("99");
        assert_eq!(compute_discount(&o), dec("30"));
    }

    #[test]
    fn unknown_scheme_is_zero() {
        let mut o = offer(PricingScheme::Unknown);
        o.original_price = dec("100");
        o.sale_price = dec("50");
        assert_eq!(compute_discount(&o), Decimal::ZERO);
    }

    #[test]
    fn price_increase_gives_negative_discount() {
        let mut o = offer(PricingScheme::SinglePrice);
        o.original_price = dec("20");
        o.sale_price = dec("25");
        assert_eq!(compute_discount(&o), dec("-25.00"));
    }

    #[test]
    fn midpoint_rounds_away_from_zero() {
        // (200 - 199.99) / 200 * 100 = 0.005
        let mut o = offer(PricingScheme::SinglePrice);
        o.original_price = dec("200");
        o.sale_price = dec("199.99");
        assert_eq!(compute_discount(&o), dec("0.01"));

        // (200 - 200.01) / 200 * 100 = -0.005
        o.sale_price = dec("200.01");
        assert_eq!(compute_discount(&o), dec("-0.01"));
    }

    #[test]
    fn multibuy_baseline_overflow_is_zero() {
        let mut o = offer(PricingScheme::MultiBuy);
        o.original_price = dec("70000000000000000000000000");
        o.sale_quantity = 2_000_000;
        o.sale_price_total = dec("1");
        assert_eq!(compute_discount(&o), Decimal::ZERO);
    }

    #[test]
    fn ratio_overflow_is_zero() {
        let mut o = offer(PricingScheme::SinglePrice);
        o.original_price = dec("0.0000000001");
        o.sale_price = dec("99999999999999999999999999");
        assert_eq!(compute_discount(&o), Decimal::ZERO);
    }

    #[test]
    fn difference_overflow_is_zero() {
        let mut o = offer(PricingScheme::SinglePrice);
        o.original_price = Decimal::MIN;
        o.sale_price = Decimal::MAX;
        assert_eq!(compute_discount(&o), Decimal::ZERO);
    }
}
