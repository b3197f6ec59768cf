use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use royaltyhub_core::{CountryCode, InvoiceNumber};
use royaltyhub_invoicing::{Invoice, InvoiceStatus};

/// Status as recorded on the invoice, without the date-derived `Overdue`.
pub fn recorded_status(invoice: &Invoice) -> InvoiceStatus {
    if invoice.is_paid() {
        InvoiceStatus::Paid
    } else if invoice.is_sent() {
        InvoiceStatus::Sent
    } else {
        InvoiceStatus::Generated
    }
}

/// Flat per-invoice row for tabular export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceSummaryRow {
    pub invoice_number: InvoiceNumber,
    pub partner: String,
    pub country: CountryCode,
    pub period: String,
    pub sell_out_amount: Decimal,
    pub royalty_amount: Decimal,
    pub ad_fund_amount: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub currency: String,
    pub created_date: NaiveDate,
    pub status: InvoiceStatus,
    pub payment_date: Option<NaiveDate>,
    pub payment_amount: Decimal,
    pub balance: Decimal,
}

impl From<&Invoice> for InvoiceSummaryRow {
    fn from(invoice: &Invoice) -> Self {
        let details = invoice.details();
        Self {
            invoice_number: invoice.number().clone(),
            partner: details.partner.clone(),
            country: details.country.clone(),
            period: details.period_label(),
            sell_out_amount: details.total_sell_out,
            royalty_amount: details.charges.royalty_amount,
            ad_fund_amount: details.charges.ad_fund_amount,
            tax_amount: details.charges.tax_amount,
            total_amount: invoice.total_amount(),
            currency: details.currency.clone(),
            created_date: invoice.created_at().date_naive(),
            status: recorded_status(invoice),
            payment_date: invoice.payment_date(),
            payment_amount: invoice.payment_amount(),
            balance: invoice.remaining_amount(),
        }
    }
}

pub fn summarize<'a>(invoices: impl IntoIterator<Item = &'a Invoice>) -> Vec<InvoiceSummaryRow> {
    invoices.into_iter().map(InvoiceSummaryRow::from).collect()
}
