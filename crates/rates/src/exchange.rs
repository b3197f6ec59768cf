//! Exchange-rate lookup with fallback to configured rates.
//!
//! A lookup failure is never fatal: the country's configured rate is used.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, warn};

use crate::country::{CountryRate, RateTable};

/// How many earlier days to try when a source has no quote for a date
/// (weekends, bank holidays).
pub const LOOKBACK_DAYS: i64 = 5;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RateLookupError {
    /// The source has no quote for this currency on this date.
    #[error("no {currency} quote for {date}")]
    NoQuote { currency: String, date: NaiveDate },

    /// The source could not be reached or returned garbage.
    #[error("exchange-rate source unavailable: {0}")]
    Unavailable(String),
}

/// Source of exchange rates, expressed as units of `currency` per USD.
pub trait ExchangeRateSource {
    fn rate(&self, currency: &str, on: NaiveDate) -> Result<Decimal, RateLookupError>;
}

impl<S: ExchangeRateSource + ?Sized> ExchangeRateSource for &S {
    fn rate(&self, currency: &str, on: NaiveDate) -> Result<Decimal, RateLookupError> {
        (**self).rate(currency, on)
    }
}

/// Date-independent rate table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticRateSource {
    rates: BTreeMap<String, Decimal>,
}

impl StaticRateSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reference rates used when no live source is configured.
    pub fn reference() -> Self {
        Self::new()
            .with_rate("BRL", Decimal::new(520, 2))
            .with_rate("EUR", Decimal::new(93, 2))
            .with_rate("USD", Decimal::ONE)
            .with_rate("GBP", Decimal::new(79, 2))
            .with_rate("MXN", Decimal::new(165, 1))
            .with_rate("COP", Decimal::from(3900))
            .with_rate("ARS", Decimal::from(350))
            .with_rate("CLP", Decimal::from(870))
    }

    pub fn with_rate(mut self, currency: impl Into<String>, rate: Decimal) -> Self {
        self.rates.insert(currency.into().to_ascii_uppercase(), rate);
        self
    }
}

impl ExchangeRateSource for StaticRateSource {
    fn rate(&self, currency: &str, on: NaiveDate) -> Result<Decimal, RateLookupError> {
        self.rates
            .get(&currency.to_ascii_uppercase())
            .copied()
            .ok_or_else(|| RateLookupError::NoQuote {
                currency: currency.to_string(),
                date: on,
            })
    }
}

/// Look up `currency` on `on`, walking back up to [`LOOKBACK_DAYS`] days while
/// the source reports no quote.
pub fn lookup_with_lookback<S: ExchangeRateSource>(
    source: &S,
    currency: &str,
    on: NaiveDate,
) -> Result<Decimal, RateLookupError> {
    let mut last_err = None;
    for back in 0..=LOOKBACK_DAYS {
        let date = on - Duration::days(back);
        match source.rate(currency, date) {
            Ok(rate) if rate > Decimal::ZERO => return Ok(rate),
            Ok(rate) => {
                return Err(RateLookupError::Unavailable(format!(
                    "non-positive {currency} rate {rate} for {date}"
                )));
            }
            Err(err @ RateLookupError::NoQuote { .. }) => last_err = Some(err),
            Err(err) => return Err(err),
        }
    }
    Err(last_err.unwrap_or(RateLookupError::NoQuote {
        currency: currency.to_string(),
        date: on,
    }))
}

/// Rate for a country's currency on a date, falling back to the configured
/// `exchange_rate` when the source fails.
pub fn resolve_exchange_rate<S: ExchangeRateSource>(
    source: &S,
    country: &CountryRate,
    on: NaiveDate,
) -> Decimal {
    match lookup_with_lookback(source, &country.currency, on) {
        Ok(rate) => {
            debug!(currency = %country.currency, %rate, %on, "exchange rate resolved");
            rate
        }
        Err(err) => {
            warn!(
                currency = %country.currency,
                fallback = %country.exchange_rate,
                error = %err,
                "exchange rate unavailable; using configured rate"
            );
            country.exchange_rate
        }
    }
}

impl RateTable {
    /// Copy of the table with every country's exchange rate resolved from
    /// `source` for `on` (configured rate kept on failure).
    pub fn refreshed_with<S: ExchangeRateSource>(&self, source: &S, on: NaiveDate) -> RateTable {
        let mut table = self.clone();
        for (_, rate) in table.countries_mut() {
            rate.exchange_rate = resolve_exchange_rate(source, rate, on);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use royaltyhub_core::CountryCode;
    use rust_decimal_macros::dec;
    use std::cell::RefCell;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Quotes only on listed dates; records every date asked for.
    struct DatedSource {
        quotes: BTreeMap<NaiveDate, Decimal>,
        asked: RefCell<Vec<NaiveDate>>,
    }

    impl ExchangeRateSource for DatedSource {
        fn rate(&self, currency: &str, on: NaiveDate) -> Result<Decimal, RateLookupError> {
            self.asked.borrow_mut().push(on);
            self.quotes.get(&on).copied().ok_or_else(|| RateLookupError::NoQuote {
                currency: currency.to_string(),
                date: on,
            })
        }
    }

    struct DownSource;

    impl ExchangeRateSource for DownSource {
        fn rate(&self, _currency: &str, _on: NaiveDate) -> Result<Decimal, RateLookupError> {
            Err(RateLookupError::Unavailable("connection refused".into()))
        }
    }

    fn brazil() -> CountryRate {
        CountryRate::new(dec!(0.08), dec!(0.02), dec!(0.15)).with_currency("BRL", dec!(5.0))
    }

    #[test]
    fn walks_back_over_weekend() {
        let source = DatedSource {
            quotes: BTreeMap::from([(date(2023, 10, 13), dec!(5.07))]),
            asked: RefCell::new(Vec::new()),
        };
        let rate = lookup_with_lookback(&source, "BRL", date(2023, 10, 15)).unwrap();
        assert_eq!(rate, dec!(5.07));
        assert_eq!(source.asked.borrow().len(), 3);
    }

    #[test]
    fn gives_up_after_lookback_window() {
        let source = DatedSource {
            quotes: BTreeMap::from([(date(2023, 10, 1), dec!(5.07))]),
            asked: RefCell::new(Vec::new()),
        };
        let err = lookup_with_lookback(&source, "BRL", date(2023, 10, 15)).unwrap_err();
        assert!(matches!(err, RateLookupError::NoQuote { .. }));
        assert_eq!(source.asked.borrow().len() as i64, LOOKBACK_DAYS + 1);
    }

    #[test]
    fn unavailable_source_falls_back_to_configured_rate() {
        let rate = resolve_exchange_rate(&DownSource, &brazil(), date(2023, 10, 15));
        assert_eq!(rate, dec!(5.0));
    }

    #[test]
    fn static_source_is_case_insensitive() {
        let source = StaticRateSource::reference();
        assert_eq!(source.rate("brl", date(2023, 1, 1)).unwrap(), dec!(5.20));
    }

    #[test]
    fn refreshed_table_mixes_live_and_configured_rates() {
        let source = StaticRateSource::new().with_rate("BRL", dec!(4.95));
        let table = RateTable::builtin().refreshed_with(&source, date(2023, 10, 15));

        let br = table.get(&CountryCode::new("BR").unwrap()).unwrap();
        assert_eq!(br.exchange_rate, dec!(4.95));
        let mx = table.get(&CountryCode::new("MX").unwrap()).unwrap();
        assert_eq!(mx.exchange_rate, dec!(17.5));
    }
}
