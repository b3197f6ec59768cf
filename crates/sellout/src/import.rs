//! Sell-out import validation.
//!
//! The whole table is validated before any line is returned: a single bad
//! row rejects the import. A row's currency must be the one configured for
//! its country, since amounts are converted with that country's rate.

use std::collections::BTreeSet;
use std::io::Read;

use rust_decimal::Decimal;
use tracing::info;

use royaltyhub_core::CountryCode;
use royaltyhub_rates::RateTable;

use crate::line::SellOutLine;
use crate::table::{ImportError, RecordTable};

/// Required sell-out columns. `Store` is optional.
pub const SELL_OUT_COLUMNS: [&str; 5] = ["Date", "Partner", "Country", "Amount", "Currency"];

const STORE_COLUMN: &str = "Store";

/// Validate a record table and convert it to sell-out lines.
pub fn parse_sell_out(
    table: &RecordTable,
    rates: &RateTable,
) -> Result<Vec<SellOutLine>, ImportError> {
    table.require_columns(&SELL_OUT_COLUMNS)?;

    let mut lines = Vec::with_capacity(table.len());
    let mut unknown = BTreeSet::new();

    for row in table.rows() {
        let date = row.date("Date")?;
        let partner = row.required_text("Partner")?;
        let country_text = row.required_text("Country")?;
        let country = CountryCode::new(country_text).map_err(|_| ImportError::InvalidCountry {
            line: row.line(),
            value: country_text.to_string(),
        })?;
        let amount = row.decimal("Amount")?;
        if amount < Decimal::ZERO {
            return Err(ImportError::NegativeAmount {
                line: row.line(),
                value: amount,
            });
        }
        let currency = row.required_text("Currency")?;
        let store = row
            .get(STORE_COLUMN)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        match rates.get(&country) {
            None => {
                unknown.insert(country.to_string());
            }
            Some(rate) if !rate.currency.eq_ignore_ascii_case(currency) => {
                return Err(ImportError::CurrencyMismatch {
                    line: row.line(),
                    country: country.to_string(),
                    expected: rate.currency.clone(),
                    found: currency.to_string(),
                });
            }
            Some(_) => {}
        }

        lines.push(SellOutLine {
            date,
            partner: partner.to_string(),
            country,
            store,
            amount,
            currency: currency.to_string(),
        });
    }

    if !unknown.is_empty() {
        return Err(ImportError::UnknownCountries(unknown.into_iter().collect()));
    }

    info!(lines = lines.len(), "sell-out import validated");
    Ok(lines)
}

/// Read comma-separated sell-out data and validate it.
pub fn read_sell_out<R: Read>(reader: R, rates: &RateTable) -> Result<Vec<SellOutLine>, ImportError> {
    let table = RecordTable::from_csv(reader)?;
    parse_sell_out(&table, rates)
}
