//! Outstanding balances and due-status counts.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use royaltyhub_core::{CountryCode, round_money};
use royaltyhub_invoicing::{DueStatus, Invoice};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountryDelinquency {
    pub country: CountryCode,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub outstanding_amount: Decimal,
    /// Outstanding share of the total, in percent, two decimals.
    pub outstanding_pct: Decimal,
}

fn outstanding_pct(outstanding: Decimal, total: Decimal) -> Decimal {
    if total.is_zero() {
        return Decimal::ZERO;
    }
    round_money(outstanding / total * Decimal::ONE_HUNDRED)
}

/// Percentage of the invoiced total still open across all invoices.
pub fn delinquency_rate<'a>(invoices: impl IntoIterator<Item = &'a Invoice>) -> Decimal {
    let (total, paid) = invoices
        .into_iter()
        .fold((Decimal::ZERO, Decimal::ZERO), |(t, p), inv| {
            (t + inv.total_amount(), p + inv.payment_amount())
        });
    outstanding_pct(total - paid, total)
}

/// Per-country outstanding balance, ordered by country code.
pub fn delinquency_by_country<'a>(
    invoices: impl IntoIterator<Item = &'a Invoice>,
) -> Vec<CountryDelinquency> {
    let mut totals: BTreeMap<CountryCode, (Decimal, Decimal)> = BTreeMap::new();
    for invoice in invoices {
        let entry = totals.entry(invoice.country().clone()).or_default();
        entry.0 += invoice.total_amount();
        entry.1 += invoice.payment_amount();
    }

    totals
        .into_iter()
        .map(|(country, (total_amount, paid_amount))| {
            let outstanding_amount = total_amount - paid_amount;
            CountryDelinquency {
                country,
                total_amount,
                paid_amount,
                outstanding_amount,
                outstanding_pct: outstanding_pct(outstanding_amount, total_amount),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DueStatusCounts {
    pub settled: usize,
    pub overdue: usize,
    pub pending: usize,
}

impl DueStatusCounts {
    pub fn total(&self) -> usize {
        self.settled + self.overdue + self.pending
    }
}

pub fn due_status_counts<'a>(
    invoices: impl IntoIterator<Item = &'a Invoice>,
    today: NaiveDate,
) -> DueStatusCounts {
    let mut counts = DueStatusCounts::default();
    for invoice in invoices {
        match invoice.due_status_on(today) {
            DueStatus::Settled => counts.settled += 1,
            DueStatus::Overdue => counts.overdue += 1,
            DueStatus::Pending => counts.pending += 1,
        }
    }
    debug!(%today, ?counts, "due statuses counted");
    counts
}
