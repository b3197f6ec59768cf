//! Totals grouped by one invoice dimension.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use royaltyhub_core::CountryCode;
use royaltyhub_invoicing::{Invoice, InvoiceStatus};

use crate::summary::recorded_status;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    Country,
    Partner,
    Period,
    Status,
}

/// Group key. Periods order chronologically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum BreakdownKey {
    Country(CountryCode),
    Partner(String),
    Period { year: i32, month: u32 },
    Status(InvoiceStatus),
}

impl core::fmt::Display for BreakdownKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BreakdownKey::Country(code) => write!(f, "{code}"),
            BreakdownKey::Partner(name) => f.write_str(name),
            BreakdownKey::Period { year, month } => write!(f, "{year}-{month:02}"),
            BreakdownKey::Status(status) => write!(f, "{status}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct GroupTotals {
    pub total_amount: Decimal,
    pub payment_amount: Decimal,
    pub balance: Decimal,
    pub invoice_count: usize,
}

impl GroupTotals {
    fn add(&mut self, invoice: &Invoice) {
        self.total_amount += invoice.total_amount();
        self.payment_amount += invoice.payment_amount();
        self.balance += invoice.remaining_amount();
        self.invoice_count += 1;
    }
}

fn key_for(invoice: &Invoice, group_by: GroupBy) -> BreakdownKey {
    let details = invoice.details();
    match group_by {
        GroupBy::Country => BreakdownKey::Country(details.country.clone()),
        GroupBy::Partner => BreakdownKey::Partner(details.partner.clone()),
        GroupBy::Period => BreakdownKey::Period {
            year: details.year,
            month: details.month,
        },
        GroupBy::Status => BreakdownKey::Status(recorded_status(invoice)),
    }
}

/// Totals per group, ordered by key.
pub fn breakdown<'a>(
    invoices: impl IntoIterator<Item = &'a Invoice>,
    group_by: GroupBy,
) -> Vec<(BreakdownKey, GroupTotals)> {
    let mut groups: BTreeMap<BreakdownKey, GroupTotals> = BTreeMap::new();
    for invoice in invoices {
        groups
            .entry(key_for(invoice, group_by))
            .or_default()
            .add(invoice);
    }
    groups.into_iter().collect()
}
