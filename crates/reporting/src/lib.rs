//! Read-only financial summaries over invoice records.

pub mod breakdown;
pub mod delinquency;
pub mod summary;

pub use breakdown::{BreakdownKey, GroupBy, GroupTotals, breakdown};
pub use delinquency::{
    CountryDelinquency, DueStatusCounts, delinquency_by_country, delinquency_rate,
    due_status_counts,
};
pub use summary::{InvoiceSummaryRow, recorded_status, summarize};
