use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use royaltyhub_core::CountryCode;
use royaltyhub_rates::EffectiveRates;

use crate::charges::Charges;

/// One raw sell-out transaction as imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellOutLine {
    pub date: NaiveDate,
    pub partner: String,
    pub country: CountryCode,
    pub store: Option<String>,
    /// Gross sale value in local currency.
    pub amount: Decimal,
    pub currency: String,
}

impl SellOutLine {
    pub fn new(
        date: NaiveDate,
        partner: impl Into<String>,
        country: CountryCode,
        amount: Decimal,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            date,
            partner: partner.into(),
            country,
            store: None,
            amount,
            currency: currency.into(),
        }
    }

    pub fn at_store(mut self, store: impl Into<String>) -> Self {
        self.store = Some(store.into());
        self
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn month(&self) -> u32 {
        self.date.month()
    }
}

/// A sell-out line annotated with the rates that applied and the resulting
/// charges. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatedLine {
    line: SellOutLine,
    rates: EffectiveRates,
    charges: Charges,
}

impl RatedLine {
    pub(crate) fn new(line: SellOutLine, rates: EffectiveRates, charges: Charges) -> Self {
        Self { line, rates, charges }
    }

    pub fn line(&self) -> &SellOutLine {
        &self.line
    }

    pub fn rates(&self) -> &EffectiveRates {
        &self.rates
    }

    pub fn charges(&self) -> &Charges {
        &self.charges
    }

    pub fn royalty_amount(&self) -> Decimal {
        self.charges.royalty_amount
    }

    pub fn ad_fund_amount(&self) -> Decimal {
        self.charges.ad_fund_amount
    }

    pub fn tax_amount(&self) -> Decimal {
        self.charges.tax_amount
    }

    pub fn total_amount(&self) -> Decimal {
        self.charges.total_amount
    }

    pub fn amount_usd(&self) -> Decimal {
        self.charges.amount_usd
    }
}
