use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

/// Applied when Zureo sends no tax multiplier, or a non-positive one.
pub const DEFAULT_TAX_MULTIPLIER: Decimal = Decimal::from_parts(122, 0, 0, false, 2);

/// Pre-tax price chosen for a row, and the multiplier applied to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceBreakdown {
    pub source_price: Decimal,
    pub tax_multiplier: Decimal,
    pub price: i64,
}

/// Storefront price in whole currency units.
///
/// The variety's own price wins when it is present and positive; otherwise
/// the product's base price is used. The result is rounded half away from
/// zero with decimal arithmetic, so `100 × 1.1` is exactly `110`.
#[must_use]
pub fn compute_price(
    base_price: Option<f64>,
    variety_price: Option<f64>,
    tax_multiplier: Option<f64>,
) -> i64 {
    price_breakdown(base_price, variety_price, tax_multiplier).price
}

/// Like [`compute_price`], also returning the inputs that were used.
#[must_use]
pub fn price_breakdown(
    base_price: Option<f64>,
    variety_price: Option<f64>,
    tax_multiplier: Option<f64>,
) -> PriceBreakdown {
    let source_price = variety_price
        .and_then(to_decimal)
        .filter(|p| p.is_sign_positive() && !p.is_zero())
        .or_else(|| base_price.and_then(to_decimal))
        .unwrap_or(Decimal::ZERO);

    let tax_multiplier = tax_multiplier
        .and_then(to_decimal)
        .filter(|m| m.is_sign_positive() && !m.is_zero())
        .unwrap_or(DEFAULT_TAX_MULTIPLIER);

    let price = (source_price * tax_multiplier)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(0)
        .max(0);

    PriceBreakdown {
        source_price,
        tax_multiplier,
        price,
    }
}

fn to_decimal(value: f64) -> Option<Decimal> {
    // Shortest round-trip form, so 1.1 becomes 1.1 rather than 1.1000000000000000888.
    if value.is_finite() {
        Decimal::from_f64(value).map(|d| d.normalize())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_price_with_default_multiplier() {
        assert_eq!(compute_price(Some(100.0), None, None), 122);
        assert_eq!(compute_price(Some(100.0), None, Some(1.22)), 122);
    }

    #[test]
    fn variety_price_wins_when_present() {
        assert_eq!(compute_price(Some(100.0), Some(150.0), Some(1.22)), 183);
    }

    #[test]
    fn non_positive_variety_price_falls_back_to_base() {
        assert_eq!(compute_price(Some(100.0), Some(0.0), Some(1.22)), 122);
        assert_eq!(compute_price(Some(100.0), Some(-5.0), Some(1.22)), 122);
    }

    #[test]
    fn non_positive_multiplier_uses_default() {
        assert_eq!(compute_price(Some(100.0), None, Some(0.0)), 122);
        assert_eq!(compute_price(Some(100.0), None, Some(-1.0)), 122);
    }

    #[test]
    fn decimal_arithmetic_avoids_float_error() {
        // 100 * 1.1 in f64 is 110.00000000000001.
        assert_eq!(compute_price(Some(100.0), None, Some(1.1)), 110);
    }

    #[test]
    fn midpoint_rounds_away_from_zero() {
        // 12.5 * 1 -> 13
        assert_eq!(compute_price(Some(12.5), None, Some(1.0)), 13);
    }

    #[test]
    fn missing_prices_yield_zero() {
        assert_eq!(compute_price(None, None, None), 0);
    }

    #[test]
    fn breakdown_keeps_source_price_and_multiplier() {
        let breakdown = price_breakdown(Some(100.0), Some(150.0), None);
        assert_eq!(breakdown.source_price, Decimal::new(150, 0));
        assert_eq!(breakdown.tax_multiplier, DEFAULT_TAX_MULTIPLIER);
        assert_eq!(breakdown.price, 183);
    }

    #[test]
    fn default_multiplier_is_1_22() {
        assert_eq!(DEFAULT_TAX_MULTIPLIER.to_string(), "1.22");
    }

    #[test]
    fn non_finite_values_are_ignored() {
        assert_eq!(compute_price(Some(f64::NAN), None, None), 0);
        assert_eq!(compute_price(Some(100.0), None, Some(f64::INFINITY)), 122);
    }
}
