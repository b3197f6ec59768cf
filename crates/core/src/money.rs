//! Money helpers over `rust_decimal`.
//!
//! Every amount and rate in the system is a `Decimal`. Comparisons between
//! amounts use a one-cent tolerance.

use rust_decimal::{Decimal, RoundingStrategy};

/// Monetary scale (cents).
pub const DECIMAL_PLACES: u32 = 2;

/// Tolerance for monetary comparisons (0.01).
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Round to cents, half away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// `true` when `a` and `b` differ by strictly less than one cent.
pub fn amounts_match(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() < MONEY_TOLERANCE
}

/// `true` when `a` and `b` differ by at most one cent.
pub fn within_tolerance(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() <= MONEY_TOLERANCE
}

/// Arithmetic mean; `None` for an empty input.
pub fn mean(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let sum: Decimal = values.iter().copied().sum();
    Some(sum / Decimal::from(values.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_money(dec!(0.125)), dec!(0.13));
        assert_eq!(round_money(dec!(-0.125)), dec!(-0.13));
        assert_eq!(round_money(dec!(33.3333)), dec!(33.33));
    }

    #[test]
    fn exact_match_is_strict_tolerance_is_inclusive() {
        assert!(amounts_match(dec!(1150.00), dec!(1150.009)));
        assert!(!amounts_match(dec!(1150.00), dec!(1150.01)));
        assert!(within_tolerance(dec!(1150.00), dec!(1150.01)));
    }

    #[test]
    fn mean_of_rates() {
        assert_eq!(mean(&[dec!(0.08), dec!(0.06)]), Some(dec!(0.07)));
        assert_eq!(mean(&[]), None);
    }
}
