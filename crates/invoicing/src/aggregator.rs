//! Invoice generation from rated sell-out lines.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info};

use royaltyhub_core::money::mean;
use royaltyhub_core::{CountryCode, DomainError, DomainResult};
use royaltyhub_sellout::{Charges, RatedLine};

use crate::invoice::{Invoice, InvoiceDetails};
use crate::number::deterministic_invoice_number;

type GroupKey = (String, CountryCode, i32, u32);

/// One invoice per (partner, country, year, month), numbered
/// deterministically so that re-running over the same lines yields the same
/// numbers. Output is ordered by group key.
pub fn aggregate_invoices(
    lines: &[RatedLine],
    generated_at: DateTime<Utc>,
) -> DomainResult<Vec<Invoice>> {
    let mut groups: BTreeMap<GroupKey, Vec<&RatedLine>> = BTreeMap::new();
    for rated in lines {
        let line = rated.line();
        groups
            .entry((line.partner.clone(), line.country.clone(), line.year(), line.month()))
            .or_default()
            .push(rated);
    }

    let invoices = groups
        .into_iter()
        .map(|(key, group)| build_invoice(key, &group, generated_at))
        .collect::<DomainResult<Vec<_>>>()?;

    info!(lines = lines.len(), invoices = invoices.len(), "invoices aggregated");
    Ok(invoices)
}

fn build_invoice(
    (partner, country, year, month): GroupKey,
    group: &[&RatedLine],
    generated_at: DateTime<Utc>,
) -> DomainResult<Invoice> {
    let first = group
        .first()
        .ok_or_else(|| DomainError::invariant("empty invoice group"))?;

    let mut charges = Charges::default();
    let mut total_sell_out = Decimal::ZERO;
    for rated in group {
        charges.accumulate(rated.charges())?;
        total_sell_out = total_sell_out
            .checked_add(rated.line().amount)
            .ok_or_else(|| DomainError::invariant("total sell-out overflow"))?;
    }

    let royalty_rates: Vec<Decimal> = group.iter().map(|r| r.rates().royalty_rate).collect();
    let ad_fund_rates: Vec<Decimal> = group.iter().map(|r| r.rates().ad_fund_rate).collect();

    let number = deterministic_invoice_number(&partner, &country, year, month)?;
    debug!(invoice_number = %number, lines = group.len(), total = %charges.total_amount, "invoice built");

    let details = InvoiceDetails {
        partner,
        country,
        year,
        month,
        total_sell_out,
        royalty_rate: mean(&royalty_rates).unwrap_or_default(),
        ad_fund_rate: mean(&ad_fund_rates).unwrap_or_default(),
        tax_rate: first.rates().tax_rate,
        charges,
        currency: first.rates().currency.clone(),
        exchange_rate: first.rates().exchange_rate,
    };

    Ok(Invoice::new(number, details, generated_at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryInvoiceStore, InvoiceStore};
    use chrono::{NaiveDate, TimeZone};
    use proptest::prelude::*;
    use royaltyhub_rates::{CountryRate, RateTable, StoreRate};
    use royaltyhub_sellout::{SellOutLine, rate_lines};
    use rust_decimal_macros::dec;

    fn code(s: &str) -> CountryCode {
        CountryCode::new(s).unwrap()
    }

    fn table() -> RateTable {
        let mut table = RateTable::new();
        table
            .insert(
                code("BR"),
                CountryRate::new(dec!(0.08), dec!(0.02), dec!(0.15))
                    .with_currency("BRL", dec!(5.0))
                    .with_store(
                        "SP-01",
                        StoreRate {
                            royalty_rate: Some(dec!(0.06)),
                            ad_fund_rate: None,
                        },
                    ),
            )
            .unwrap();
        table
            .insert(code("US"), CountryRate::new(dec!(0.06), dec!(0.015), dec!(0)))
            .unwrap();
        table
    }

    fn line(day: u32, month: u32, partner: &str, country: &str, amount: Decimal) -> SellOutLine {
        SellOutLine::new(
            NaiveDate::from_ymd_opt(2023, month, day).unwrap(),
            partner,
            code(country),
            amount,
            if country == "BR" { "BRL" } else { "USD" },
        )
    }

    fn generated_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 11, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn groups_by_partner_country_and_month() {
        let lines = vec![
            line(3, 10, "Acme", "BR", dec!(6000)),
            line(20, 10, "Acme", "BR", dec!(4000)),
            line(5, 11, "Acme", "BR", dec!(1000)),
            line(5, 10, "Acme", "US", dec!(1000)),
            line(5, 10, "Beta", "BR", dec!(500)),
        ];
        let rated = rate_lines(lines, &table()).unwrap();
        let invoices = aggregate_invoices(&rated, generated_at()).unwrap();

        let numbers: Vec<_> = invoices.iter().map(|i| i.number().to_string()).collect();
        assert_eq!(
            numbers,
            ["ACM-202310-BR", "ACM-202311-BR", "ACM-202310-US", "BET-202310-BR"]
        );

        let october = &invoices[0];
        let d = october.details();
        assert_eq!(d.total_sell_out, dec!(10000));
        assert_eq!(d.charges.royalty_amount, dec!(800));
        assert_eq!(d.charges.ad_fund_amount, dec!(200));
        assert_eq!(d.charges.tax_amount, dec!(150));
        assert_eq!(october.total_amount(), dec!(1150));
        assert_eq!(october.amount_usd(), dec!(230));
        assert_eq!(october.currency(), "BRL");
        assert!(!october.is_sent());
        assert!(!october.is_paid());
        assert_eq!(october.payment_amount(), Decimal::ZERO);
    }

    #[test]
    fn display_rate_is_mean_of_line_rates() {
        let lines = vec![
            line(3, 10, "Acme", "BR", dec!(1000)),
            line(4, 10, "Acme", "BR", dec!(1000)).at_store("SP-01"),
        ];
        let rated = rate_lines(lines, &table()).unwrap();
        let invoices = aggregate_invoices(&rated, generated_at()).unwrap();

        assert_eq!(invoices.len(), 1);
        let d = invoices[0].details();
        assert_eq!(d.royalty_rate, dec!(0.07));
        assert_eq!(d.ad_fund_rate, dec!(0.02));
        assert_eq!(d.charges.royalty_amount, dec!(140));
    }

    #[test]
    fn overflowing_group_total_is_an_error() {
        let lines = vec![
            line(3, 10, "Acme", "US", Decimal::MAX),
            line(4, 10, "Acme", "US", Decimal::MAX),
        ];
        let rated = rate_lines(lines, &table()).unwrap();
        let err = aggregate_invoices(&rated, generated_at()).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn empty_input_yields_no_invoices() {
        assert!(aggregate_invoices(&[], generated_at()).unwrap().is_empty());
    }

    fn arb_line() -> impl Strategy<Value = SellOutLine> {
        (
            1u32..=28,
            1u32..=12,
            prop::sample::select(vec!["Acme", "Beta", "Gamma"]),
            prop::sample::select(vec!["BR", "US"]),
            0i64..10_000_000,
        )
            .prop_map(|(day, month, partner, country, cents)| {
                line(day, month, partner, country, Decimal::new(cents, 2))
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, ..ProptestConfig::default() })]

        #[test]
        fn rerunning_generation_adds_nothing(lines in prop::collection::vec(arb_line(), 0..40)) {
            let rated = rate_lines(lines, &table()).unwrap();
            let store = InMemoryInvoiceStore::new();

            let first = store.insert_batch(aggregate_invoices(&rated, generated_at()).unwrap()).unwrap();
            prop_assert!(first.skipped.is_empty());

            let second = store.insert_batch(aggregate_invoices(&rated, generated_at()).unwrap()).unwrap();
            prop_assert!(second.inserted.is_empty());
            prop_assert_eq!(store.len(), first.inserted.len());
        }
    }
}
