//! Header-addressed text records read from delimited files.

use std::io::Read;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use thiserror::Error;

/// Import validation failure. Reported before any row is processed.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to read records: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("line {line}: `{value}` is not a valid date (expected YYYY-MM-DD)")]
    InvalidDate { line: usize, value: String },

    #[error("line {line}: `{value}` in column {column} is not numeric")]
    InvalidAmount {
        line: usize,
        column: String,
        value: String,
    },

    #[error("line {line}: amount {value} must not be negative")]
    NegativeAmount { line: usize, value: Decimal },

    #[error("line {line}: column {column} is empty")]
    EmptyField { line: usize, column: String },

    #[error("line {line}: invalid country code `{value}`")]
    InvalidCountry { line: usize, value: String },

    #[error("line {line}: currency `{found}` does not match {country}'s configured currency {expected}")]
    CurrencyMismatch {
        line: usize,
        country: String,
        expected: String,
        found: String,
    },

    #[error("unknown countries: {}; configure them in the country settings first", .0.join(", "))]
    UnknownCountries(Vec<String>),
}

/// Rows of text cells addressed by header name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RecordTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let headers = headers.into_iter().map(|h| h.trim().to_string()).collect();
        Self { headers, rows }
    }

    /// Read comma-separated text with a header row.
    pub fn from_csv<R: Read>(reader: R) -> Result<Self, ImportError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Self::new(headers, rows))
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_index(column).is_some()
    }

    fn column_index(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }

    /// Fail with every missing column name at once.
    pub fn require_columns(&self, required: &[&str]) -> Result<(), ImportError> {
        let missing: Vec<String> = required
            .iter()
            .filter(|c| !self.has_column(c))
            .map(|c| c.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ImportError::MissingColumns(missing))
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().enumerate().map(move |(idx, cells)| Row {
            table: self,
            cells,
            // header occupies line 1
            line: idx + 2,
        })
    }
}

/// One data row.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'a RecordTable,
    cells: &'a [String],
    line: usize,
}

impl<'a> Row<'a> {
    pub fn line(&self) -> usize {
        self.line
    }

    /// Cell text, `None` when the column is absent or the row is short.
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let idx = self.table.column_index(column)?;
        self.cells.get(idx).map(String::as_str)
    }

    pub fn text(&self, column: &str) -> &'a str {
        self.get(column).unwrap_or("")
    }

    pub fn required_text(&self, column: &str) -> Result<&'a str, ImportError> {
        let value = self.text(column);
        if value.is_empty() {
            return Err(ImportError::EmptyField {
                line: self.line,
                column: column.to_string(),
            });
        }
        Ok(value)
    }

    pub fn date(&self, column: &str) -> Result<NaiveDate, ImportError> {
        let value = self.text(column);
        parse_date(value).ok_or_else(|| ImportError::InvalidDate {
            line: self.line,
            value: value.to_string(),
        })
    }

    pub fn decimal(&self, column: &str) -> Result<Decimal, ImportError> {
        let value = self.text(column);
        Decimal::from_str(value)
            .or_else(|_| Decimal::from_scientific(value))
            .map_err(|_| ImportError::InvalidAmount {
                line: self.line,
                column: column.to_string(),
                value: value.to_string(),
            })
    }
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time of day.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}
