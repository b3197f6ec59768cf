//! Payment reconciliation: bank statement import, scoring of open invoices
//! against incoming payments, and application of matched payments.
//!
//! Not finding a match is a normal outcome, never an error.

pub mod driver;
pub mod matcher;
pub mod statement;

pub use driver::{
    MANUAL_MATCH_REASON, MANUAL_MATCH_SCORE, ReconciledPayment, ReconciliationReport,
    reconcile_batch, reconcile_manually,
};
pub use matcher::{
    INVOICE_NUMBER_PATTERN, MatchCandidate, MatcherConfig, extract_invoice_number,
    find_candidates,
};
pub use statement::{BankTransaction, STATEMENT_COLUMNS, parse_statement, read_statement};
