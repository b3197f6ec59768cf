//! Bank statement rows.

use std::io::Read;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use royaltyhub_sellout::{ImportError, RecordTable};

/// Required statement columns. `Reference` is optional.
pub const STATEMENT_COLUMNS: [&str; 3] = ["Date", "Amount", "Description"];

const REFERENCE_COLUMN: &str = "Reference";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankTransaction {
    pub date: NaiveDate,
    /// Signed; positive is money received.
    pub amount: Decimal,
    pub description: String,
    #[serde(default)]
    pub reference: String,
}

impl BankTransaction {
    pub fn new(date: NaiveDate, amount: Decimal, description: impl Into<String>) -> Self {
        Self {
            date,
            amount,
            description: description.into(),
            reference: String::new(),
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = reference.into();
        self
    }

    pub fn is_inflow(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    pub fn is_outflow(&self) -> bool {
        self.amount < Decimal::ZERO
    }
}

pub fn parse_statement(table: &RecordTable) -> Result<Vec<BankTransaction>, ImportError> {
    table.require_columns(&STATEMENT_COLUMNS)?;

    let transactions = table
        .rows()
        .map(|row| {
            Ok(BankTransaction {
                date: row.date("Date")?,
                amount: row.decimal("Amount")?,
                description: row.text("Description").to_string(),
                reference: row.text(REFERENCE_COLUMN).to_string(),
            })
        })
        .collect::<Result<Vec<_>, ImportError>>()?;

    info!(transactions = transactions.len(), "bank statement validated");
    Ok(transactions)
}

pub fn read_statement<R: Read>(reader: R) -> Result<Vec<BankTransaction>, ImportError> {
    parse_statement(&RecordTable::from_csv(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn reads_signed_amounts_and_optional_reference() {
        let csv = "\
Date,Amount,Description,Reference
2023-10-15,1150.00,Payment ref ACM-202310-BR,
2023-10-16,-42.10,Bank fee,FEE-1
";
        let txns = read_statement(csv.as_bytes()).unwrap();
        assert_eq!(txns.len(), 2);
        assert_eq!(txns[0].amount, dec!(1150.00));
        assert!(txns[0].is_inflow());
        assert_eq!(txns[0].reference, "");
        assert!(txns[1].is_outflow());
        assert_eq!(txns[1].reference, "FEE-1");
    }

    #[test]
    fn reference_column_may_be_absent() {
        let csv = "Date,Amount,Description\n2023-10-15,10,Wire\n";
        let txns = read_statement(csv.as_bytes()).unwrap();
        assert_eq!(txns[0].reference, "");
    }

    #[test]
    fn rejects_missing_columns_and_bad_values() {
        let missing = read_statement("Date,Amount\n2023-10-15,10\n".as_bytes()).unwrap_err();
        assert!(matches!(missing, ImportError::MissingColumns(cols) if cols == ["Description"]));

        let bad_date = read_statement("Date,Amount,Description\n15/10/2023,10,x\n".as_bytes());
        assert!(matches!(bad_date, Err(ImportError::InvalidDate { line: 2, .. })));

        let bad_amount = read_statement("Date,Amount,Description\n2023-10-15,ten,x\n".as_bytes());
        assert!(matches!(bad_amount, Err(ImportError::InvalidAmount { line: 2, .. })));
    }
}
