use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use royaltyhub_core::{CountryCode, DomainError, DomainResult, ValueObject};

/// Store key used as fallback when a store has no entry of its own.
pub const DEFAULT_STORE_KEY: &str = "default";

fn default_currency() -> String {
    "USD".to_string()
}

fn default_exchange_rate() -> Decimal {
    Decimal::ONE
}

/// Per-store override of the royalty and ad-fund rates.
///
/// Either rate may be omitted; the country-level rate is used instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreRate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub royalty_rate: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_fund_rate: Option<Decimal>,
}

/// Rates configured for one country. All rates are fractions (0.08 = 8%).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryRate {
    pub royalty_rate: Decimal,
    pub ad_fund_rate: Decimal,
    pub tax_rate: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Units of local currency per USD.
    #[serde(default = "default_exchange_rate")]
    pub exchange_rate: Decimal,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub stores: BTreeMap<String, StoreRate>,
}

/// Rates that apply to one sell-out line after store resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveRates {
    pub royalty_rate: Decimal,
    pub ad_fund_rate: Decimal,
    pub tax_rate: Decimal,
    pub currency: String,
    pub exchange_rate: Decimal,
}

impl ValueObject for EffectiveRates {}

fn check_fraction(field: &str, value: Decimal) -> DomainResult<()> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(DomainError::validation(format!(
            "{field} must be a fraction between 0 and 1, got {value}"
        )));
    }
    Ok(())
}

impl CountryRate {
    pub fn new(royalty_rate: Decimal, ad_fund_rate: Decimal, tax_rate: Decimal) -> Self {
        Self {
            royalty_rate,
            ad_fund_rate,
            tax_rate,
            currency: default_currency(),
            exchange_rate: default_exchange_rate(),
            stores: BTreeMap::new(),
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>, exchange_rate: Decimal) -> Self {
        self.currency = currency.into();
        self.exchange_rate = exchange_rate;
        self
    }

    pub fn with_store(mut self, store_id: impl Into<String>, rate: StoreRate) -> Self {
        self.stores.insert(store_id.into(), rate);
        self
    }

    /// Invariant: rates are fractions in 0..=1 and the exchange rate is positive.
    pub fn validate(&self) -> DomainResult<()> {
        check_fraction("royalty_rate", self.royalty_rate)?;
        check_fraction("ad_fund_rate", self.ad_fund_rate)?;
        check_fraction("tax_rate", self.tax_rate)?;
        if self.exchange_rate <= Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "exchange_rate must be positive, got {}",
                self.exchange_rate
            )));
        }
        if self.currency.trim().is_empty() {
            return Err(DomainError::validation("currency must not be empty"));
        }
        for (store, rate) in &self.stores {
            if let Some(r) = rate.royalty_rate {
                check_fraction(&format!("stores.{store}.royalty_rate"), r)?;
            }
            if let Some(r) = rate.ad_fund_rate {
                check_fraction(&format!("stores.{store}.ad_fund_rate"), r)?;
            }
        }
        Ok(())
    }

    /// Resolve royalty/ad-fund for a store: exact store entry, then the
    /// `default` store entry, then the country rate. Tax and exchange rate are
    /// always country-level.
    pub fn effective_for(&self, store: Option<&str>) -> EffectiveRates {
        let store_rate = store
            .and_then(|id| self.stores.get(id))
            .or_else(|| self.stores.get(DEFAULT_STORE_KEY));

        let (royalty_rate, ad_fund_rate) = match store_rate {
            Some(s) => (
                s.royalty_rate.unwrap_or(self.royalty_rate),
                s.ad_fund_rate.unwrap_or(self.ad_fund_rate),
            ),
            None => (self.royalty_rate, self.ad_fund_rate),
        };

        EffectiveRates {
            royalty_rate,
            ad_fund_rate,
            tax_rate: self.tax_rate,
            currency: self.currency.clone(),
            exchange_rate: self.exchange_rate,
        }
    }
}

/// Country code → rates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateTable {
    countries: BTreeMap<CountryCode, CountryRate>,
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in table used when no settings file exists yet.
    pub fn builtin() -> Self {
        let mut table = Self::new();
        let entries = [
            ("BR", Decimal::new(8, 2), Decimal::new(2, 2), Decimal::new(15, 2), "BRL", Decimal::from(5)),
            ("US", Decimal::new(6, 2), Decimal::new(15, 3), Decimal::ZERO, "USD", Decimal::ONE),
            ("MX", Decimal::new(7, 2), Decimal::new(2, 2), Decimal::new(16, 2), "MXN", Decimal::new(175, 1)),
        ];
        for (code, royalty, ad_fund, tax, currency, exchange_rate) in entries {
            let rate = CountryRate::new(royalty, ad_fund, tax)
                .with_currency(currency, exchange_rate)
                .with_store(
                    DEFAULT_STORE_KEY,
                    StoreRate {
                        royalty_rate: Some(royalty),
                        ad_fund_rate: Some(ad_fund),
                    },
                );
            if let Ok(code) = CountryCode::new(code) {
                table.countries.insert(code, rate);
            }
        }
        table
    }

    pub fn insert(&mut self, code: CountryCode, rate: CountryRate) -> DomainResult<()> {
        rate.validate()
            .map_err(|e| DomainError::validation(format!("{code}: {e}")))?;
        self.countries.insert(code, rate);
        Ok(())
    }

    pub fn remove(&mut self, code: &CountryCode) -> Option<CountryRate> {
        self.countries.remove(code)
    }

    pub fn get(&self, code: &CountryCode) -> Option<&CountryRate> {
        self.countries.get(code)
    }

    pub fn contains(&self, code: &CountryCode) -> bool {
        self.countries.contains_key(code)
    }

    pub fn codes(&self) -> impl Iterator<Item = &CountryCode> {
        self.countries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CountryCode, &CountryRate)> {
        self.countries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    /// Rates for a country/store pair; fails with `UnknownCountry` when the
    /// country has no entry.
    pub fn effective_rates(
        &self,
        country: &CountryCode,
        store: Option<&str>,
    ) -> DomainResult<EffectiveRates> {
        self.countries
            .get(country)
            .map(|rate| rate.effective_for(store))
            .ok_or_else(|| DomainError::unknown_country(country.as_str()))
    }

    /// Validate every entry (used after loading from disk).
    pub fn validate(&self) -> DomainResult<()> {
        for (code, rate) in &self.countries {
            rate.validate()
                .map_err(|e| DomainError::validation(format!("{code}: {e}")))?;
        }
        Ok(())
    }

    pub(crate) fn countries_mut(&mut self) -> impl Iterator<Item = (&CountryCode, &mut CountryRate)> {
        self.countries.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn code(s: &str) -> CountryCode {
        CountryCode::new(s).unwrap()
    }

    fn brazil() -> CountryRate {
        CountryRate::new(dec!(0.08), dec!(0.02), dec!(0.15)).with_currency("BRL", dec!(5.0))
    }

    #[test]
    fn country_rate_applies_without_stores() {
        let rates = brazil().effective_for(Some("store-1"));
        assert_eq!(rates.royalty_rate, dec!(0.08));
        assert_eq!(rates.ad_fund_rate, dec!(0.02));
        assert_eq!(rates.tax_rate, dec!(0.15));
        assert_eq!(rates.currency, "BRL");
    }

    #[test]
    fn store_override_wins_over_default_entry() {
        let rate = brazil()
            .with_store(
                DEFAULT_STORE_KEY,
                StoreRate { royalty_rate: Some(dec!(0.07)), ad_fund_rate: None },
            )
            .with_store(
                "SP-01",
                StoreRate { royalty_rate: Some(dec!(0.05)), ad_fund_rate: Some(dec!(0.01)) },
            );

        let sp = rate.effective_for(Some("SP-01"));
        assert_eq!(sp.royalty_rate, dec!(0.05));
        assert_eq!(sp.ad_fund_rate, dec!(0.01));

        let other = rate.effective_for(Some("RJ-02"));
        assert_eq!(other.royalty_rate, dec!(0.07));
        assert_eq!(other.ad_fund_rate, dec!(0.02));

        let none = rate.effective_for(None);
        assert_eq!(none.royalty_rate, dec!(0.07));
    }

    #[test]
    fn tax_rate_ignores_store_override() {
        let rate = brazil().with_store(
            "SP-01",
            StoreRate { royalty_rate: Some(dec!(0.01)), ad_fund_rate: Some(dec!(0.01)) },
        );
        assert_eq!(rate.effective_for(Some("SP-01")).tax_rate, dec!(0.15));
        assert_eq!(rate.effective_for(Some("SP-01")).exchange_rate, dec!(5.0));
    }

    #[test]
    fn unknown_country_is_reported() {
        let table = RateTable::builtin();
        let err = table.effective_rates(&code("AR"), None).unwrap_err();
        assert_eq!(err, DomainError::UnknownCountry("AR".to_string()));
    }

    #[test]
    fn insert_rejects_non_positive_exchange_rate() {
        let mut table = RateTable::new();
        let bad = brazil().with_currency("BRL", Decimal::ZERO);
        let err = table.insert(code("BR"), bad).unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("exchange_rate")));
    }

    #[test]
    fn insert_rejects_percent_style_rates() {
        let mut table = RateTable::new();
        let bad = CountryRate::new(dec!(8.0), dec!(0.02), dec!(0.15));
        assert!(table.insert(code("BR"), bad).is_err());
    }

    #[test]
    fn builtin_table_is_valid() {
        let table = RateTable::builtin();
        assert_eq!(table.len(), 3);
        table.validate().unwrap();
        let us = table.get(&code("US")).unwrap();
        assert_eq!(us.ad_fund_rate, dec!(0.015));
    }
}
