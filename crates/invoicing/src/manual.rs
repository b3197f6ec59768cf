//! Single invoices entered by hand, outside of a sell-out import.

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use royaltyhub_core::{CountryCode, DomainError, DomainResult};
use royaltyhub_rates::{EffectiveRates, RateTable};
use royaltyhub_sellout::Charges;

use crate::installments::{InstallmentPlan, schedule_installments};
use crate::invoice::{Invoice, InvoiceDetails};
use crate::number::random_invoice_number;
use crate::store::InvoiceStore;

pub const MAX_NOTES_LEN: usize = 500;

/// Rates left as `None` come from the country's configured (country-level)
/// rates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualInvoiceRequest {
    pub partner: String,
    pub country: CountryCode,
    pub year: i32,
    pub month: u32,
    pub total_sales: Decimal,
    #[serde(default)]
    pub royalty_rate: Option<Decimal>,
    #[serde(default)]
    pub ad_fund_rate: Option<Decimal>,
    #[serde(default)]
    pub tax_rate: Option<Decimal>,
    #[serde(default)]
    pub exchange_rate: Option<Decimal>,
    #[serde(default)]
    pub issue_date: Option<NaiveDate>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub installments: Option<InstallmentPlan>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ManualInvoiceRequest {
    pub fn new(
        partner: impl Into<String>,
        country: CountryCode,
        year: i32,
        month: u32,
        total_sales: Decimal,
    ) -> Self {
        Self {
            partner: partner.into(),
            country,
            year,
            month,
            total_sales,
            royalty_rate: None,
            ad_fund_rate: None,
            tax_rate: None,
            exchange_rate: None,
            issue_date: None,
            due_date: None,
            installments: None,
            notes: None,
        }
    }

    fn validate(&self) -> DomainResult<()> {
        if self.partner.trim().is_empty() {
            return Err(DomainError::validation("partner name is required"));
        }
        if !(1..=12).contains(&self.month) {
            return Err(DomainError::validation(format!("invalid month {}", self.month)));
        }
        if self.total_sales <= Decimal::ZERO {
            return Err(DomainError::validation("total sales must be positive"));
        }
        if self.notes.as_deref().is_some_and(|n| n.chars().count() > MAX_NOTES_LEN) {
            return Err(DomainError::validation(format!(
                "notes cannot exceed {MAX_NOTES_LEN} characters"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualInvoice {
    pub invoice: Invoice,
    /// Non-blocking issues (installment sum mismatch).
    pub warnings: Vec<String>,
}

pub fn build_manual_invoice<R: Rng + ?Sized>(
    request: ManualInvoiceRequest,
    rates: &RateTable,
    created_at: DateTime<Utc>,
    rng: &mut R,
) -> DomainResult<ManualInvoice> {
    request.validate()?;

    let configured = rates
        .get(&request.country)
        .ok_or_else(|| DomainError::unknown_country(request.country.as_str()))?;

    let effective = EffectiveRates {
        royalty_rate: request.royalty_rate.unwrap_or(configured.royalty_rate),
        ad_fund_rate: request.ad_fund_rate.unwrap_or(configured.ad_fund_rate),
        tax_rate: request.tax_rate.unwrap_or(configured.tax_rate),
        currency: configured.currency.clone(),
        exchange_rate: request.exchange_rate.unwrap_or(configured.exchange_rate),
    };
    for (field, value) in [
        ("royalty_rate", effective.royalty_rate),
        ("ad_fund_rate", effective.ad_fund_rate),
        ("tax_rate", effective.tax_rate),
    ] {
        if value < Decimal::ZERO || value > Decimal::ONE {
            return Err(DomainError::validation(format!(
                "{field} must be a fraction between 0 and 1, got {value}"
            )));
        }
    }

    let charges = Charges::compute(request.total_sales, &effective)?;
    let number = random_invoice_number(&request.partner, &request.country, created_at, rng)?;

    let details = InvoiceDetails {
        partner: request.partner.trim().to_string(),
        country: request.country,
        year: request.year,
        month: request.month,
        total_sell_out: request.total_sales,
        royalty_rate: effective.royalty_rate,
        ad_fund_rate: effective.ad_fund_rate,
        tax_rate: effective.tax_rate,
        charges,
        currency: effective.currency,
        exchange_rate: effective.exchange_rate,
    };

    let mut invoice = Invoice::new(number, details, created_at);
    let mut warnings = Vec::new();

    if let Some(issue_date) = request.issue_date {
        invoice.set_issue_date(Some(issue_date));
    }
    if let Some(due_date) = request.due_date {
        invoice.set_due_date(Some(due_date));
    }
    if let Some(plan) = &request.installments {
        let schedule = schedule_installments(invoice.total_amount(), plan)?;
        warnings.extend(schedule.warning);
        invoice.set_installments(schedule.installments);
    }
    if let Some(notes) = request.notes {
        invoice.set_notes(notes);
    }

    Ok(ManualInvoice { invoice, warnings })
}

/// Build and store a manual invoice. A number clash is a `Conflict`; the
/// caller regenerates.
pub fn issue_manual_invoice<S, R>(
    store: &S,
    request: ManualInvoiceRequest,
    rates: &RateTable,
    created_at: DateTime<Utc>,
    rng: &mut R,
) -> DomainResult<ManualInvoice>
where
    S: InvoiceStore + ?Sized,
    R: Rng + ?Sized,
{
    let manual = build_manual_invoice(request, rates, created_at, rng)?;
    store.insert_unique(manual.invoice.clone())?;
    info!(
        invoice_number = %manual.invoice.number(),
        total = %manual.invoice.total_amount(),
        "manual invoice issued"
    );
    Ok(manual)
}
