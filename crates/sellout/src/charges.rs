//! Charge calculation for one sales amount.
//!
//! Ordering: royalty and ad-fund are computed on the gross amount, tax on
//! their subtotal. Every generation path (imported lines, manual invoices)
//! goes through [`Charges::compute`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use royaltyhub_core::{DomainError, DomainResult, ValueObject};
use royaltyhub_rates::EffectiveRates;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Charges {
    pub royalty_amount: Decimal,
    pub ad_fund_amount: Decimal,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub amount_usd: Decimal,
}

impl ValueObject for Charges {}

fn overflow(what: &str) -> DomainError {
    DomainError::invariant(format!("{what} overflow"))
}

impl Charges {
    pub fn compute(amount: Decimal, rates: &EffectiveRates) -> DomainResult<Self> {
        if rates.exchange_rate <= Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "exchange_rate must be positive, got {}",
                rates.exchange_rate
            )));
        }

        let royalty_amount = amount
            .checked_mul(rates.royalty_rate)
            .ok_or_else(|| overflow("royalty amount"))?;
        let ad_fund_amount = amount
            .checked_mul(rates.ad_fund_rate)
            .ok_or_else(|| overflow("ad fund amount"))?;
        let subtotal = royalty_amount
            .checked_add(ad_fund_amount)
            .ok_or_else(|| overflow("subtotal"))?;
        let tax_amount = subtotal
            .checked_mul(rates.tax_rate)
            .ok_or_else(|| overflow("tax amount"))?;
        let total_amount = subtotal
            .checked_add(tax_amount)
            .ok_or_else(|| overflow("total amount"))?;
        let amount_usd = total_amount
            .checked_div(rates.exchange_rate)
            .ok_or_else(|| overflow("USD amount"))?;

        Ok(Self {
            royalty_amount,
            ad_fund_amount,
            subtotal,
            tax_amount,
            total_amount,
            amount_usd,
        })
    }

    /// Component-wise sum (aggregating lines into an invoice). On overflow
    /// `self` is left untouched.
    pub fn accumulate(&mut self, other: &Charges) -> DomainResult<()> {
        let add = |a: Decimal, b: Decimal, what: &str| a.checked_add(b).ok_or_else(|| overflow(what));

        *self = Self {
            royalty_amount: add(self.royalty_amount, other.royalty_amount, "royalty amount")?,
            ad_fund_amount: add(self.ad_fund_amount, other.ad_fund_amount, "ad fund amount")?,
            subtotal: add(self.subtotal, other.subtotal, "subtotal")?,
            tax_amount: add(self.tax_amount, other.tax_amount, "tax amount")?,
            total_amount: add(self.total_amount, other.total_amount, "total amount")?,
            amount_usd: add(self.amount_usd, other.amount_usd, "USD amount")?,
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn brazil() -> EffectiveRates {
        EffectiveRates {
            royalty_rate: dec!(0.08),
            ad_fund_rate: dec!(0.02),
            tax_rate: dec!(0.15),
            currency: "BRL".into(),
            exchange_rate: dec!(5.0),
        }
    }

    #[test]
    fn brazil_ten_thousand_sale() {
        let c = Charges::compute(dec!(10000), &brazil()).unwrap();
        assert_eq!(c.royalty_amount, dec!(800));
        assert_eq!(c.ad_fund_amount, dec!(200));
        assert_eq!(c.subtotal, dec!(1000));
        assert_eq!(c.tax_amount, dec!(150));
        assert_eq!(c.total_amount, dec!(1150));
        assert_eq!(c.amount_usd, dec!(230));
    }

    #[test]
    fn zero_exchange_rate_is_rejected() {
        let mut rates = brazil();
        rates.exchange_rate = Decimal::ZERO;
        let err = Charges::compute(dec!(100), &rates).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn accumulate_sums_every_component() {
        let a = Charges::compute(dec!(10000), &brazil()).unwrap();
        let mut total = Charges::default();
        total.accumulate(&a).unwrap();
        total.accumulate(&a).unwrap();
        assert_eq!(total.total_amount, dec!(2300));
        assert_eq!(total.amount_usd, dec!(460));
    }

    #[test]
    fn accumulate_overflow_is_an_invariant_violation() {
        let huge = Charges {
            total_amount: Decimal::MAX,
            ..Charges::default()
        };
        let mut total = huge;
        let err = total.accumulate(&huge).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert_eq!(total, huge);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: the total depends only on (amount, royalty, ad fund, tax)
        /// and equals amount * (r + f) * (1 + t).
        #[test]
        fn total_is_reproducible_from_rates(
            cents in 0i64..1_000_000_000i64,
            r in 0u32..=100u32,
            f in 0u32..=100u32,
            t in 0u32..=100u32,
        ) {
            let rates = EffectiveRates {
                royalty_rate: Decimal::new(r as i64, 2),
                ad_fund_rate: Decimal::new(f as i64, 2),
                tax_rate: Decimal::new(t as i64, 2),
                currency: "XXX".into(),
                exchange_rate: dec!(3.7),
            };
            let amount = Decimal::new(cents, 2);

            let first = Charges::compute(amount, &rates).unwrap();
            let second = Charges::compute(amount, &rates).unwrap();
            prop_assert_eq!(first, second);

            let expected = amount * (rates.royalty_rate + rates.ad_fund_rate) * (Decimal::ONE + rates.tax_rate);
            prop_assert_eq!(first.total_amount, expected);
        }
    }
}
